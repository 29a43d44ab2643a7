//! Patient use-case service.
//!
//! # Responsibility
//! - Provide admission-level entry points (register, insure, book, discharge)
//!   on top of the generic repositories.
//! - Apply the deployment page policy to list requests.
//!
//! # Invariants
//! - Service APIs never bypass repository validation or cascade rules.
//! - Booking requires an existing patient; the check and the insert both go
//!   through repositories, so a missing doctor still surfaces as
//!   `ReferenceViolation` from the store.

use crate::config::{PagePolicy, StoreConfig};
use crate::model::appointment::{Appointment, AppointmentId};
use crate::model::doctor::DoctorId;
use crate::model::insurance::Insurance;
use crate::model::patient::{Patient, PatientId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::page::{Page, PageRequest, Sort};
use crate::repo::sqlite_repo::Repository;
use chrono::NaiveDateTime;

/// Request model for booking one appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookAppointmentRequest {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub appointment_time: NaiveDateTime,
    /// Free-text reason, at most 500 characters.
    pub reason: Option<String>,
}

/// Use-case service over patient and appointment repositories.
pub struct PatientService<P, A>
where
    P: Repository<Patient>,
    A: Repository<Appointment>,
{
    patients: P,
    appointments: A,
    page_policy: PagePolicy,
}

impl<P, A> PatientService<P, A>
where
    P: Repository<Patient>,
    A: Repository<Appointment>,
{
    /// Creates a service with the default page policy.
    pub fn new(patients: P, appointments: A) -> Self {
        Self {
            patients,
            appointments,
            page_policy: PagePolicy::default(),
        }
    }

    /// Creates a service using the configured page policy.
    pub fn from_config(patients: P, appointments: A, config: &StoreConfig) -> Self {
        Self::new(patients, appointments).with_page_policy(config.page_policy())
    }

    pub fn with_page_policy(mut self, page_policy: PagePolicy) -> Self {
        self.page_policy = page_policy;
        self
    }

    /// Registers a new patient, including an inline insurance if present.
    pub fn register(&self, patient: &Patient) -> RepoResult<Patient> {
        self.patients.create(patient)
    }

    pub fn get(&self, patient_id: PatientId) -> RepoResult<Patient> {
        self.patients.get_by_id(patient_id)
    }

    /// Lists one page of patients.
    ///
    /// A missing or zero `size` falls back to the policy default; larger
    /// sizes are clamped to the policy maximum.
    pub fn list(&self, page: u32, size: Option<u32>, sort: Option<Sort>) -> RepoResult<Page<Patient>> {
        let request = PageRequest {
            page,
            size: self.page_policy.normalize(size),
            sort,
        };
        self.patients.get_all(&request)
    }

    /// Attaches an insurance to the patient, replacing any previous one.
    ///
    /// The replaced insurance is deleted in the same transaction.
    pub fn assign_insurance(
        &self,
        patient_id: PatientId,
        insurance: Insurance,
    ) -> RepoResult<Patient> {
        let mut patient = self.patients.get_by_id(patient_id)?;
        patient.insurance = Some(insurance);
        self.patients.update(&patient)
    }

    /// Detaches and deletes the patient's insurance. No-op without one.
    pub fn remove_insurance(&self, patient_id: PatientId) -> RepoResult<Patient> {
        let mut patient = self.patients.get_by_id(patient_id)?;
        if patient.insurance.take().is_none() {
            return Ok(patient);
        }
        self.patients.update(&patient)
    }

    /// Books one appointment for an existing patient.
    pub fn book_appointment(&self, request: BookAppointmentRequest) -> RepoResult<Appointment> {
        if !self.patients.exists(request.patient_id)? {
            return Err(RepoError::NotFound {
                entity: "patient",
                id: request.patient_id,
            });
        }

        let mut appointment = Appointment::new(
            request.appointment_time,
            request.patient_id,
            request.doctor_id,
        );
        appointment.reason = request.reason;
        self.appointments.create(&appointment)
    }

    pub fn cancel_appointment(&self, appointment_id: AppointmentId) -> RepoResult<()> {
        self.appointments.delete(appointment_id)
    }

    /// Removes the patient together with its appointments and insurance.
    pub fn discharge(&self, patient_id: PatientId) -> RepoResult<()> {
        self.patients.delete(patient_id)
    }
}
