//! Appointment record.
//!
//! # Invariants
//! - `patient_id` is required and fixed once the appointment exists; the
//!   appointment is removed together with its patient.

use super::doctor::DoctorId;
use super::patient::PatientId;
use super::{limit_text, require_reference, RecordId, ValidationError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type AppointmentId = RecordId;

pub const REASON_MAX_CHARS: usize = 500;

const ENTITY: &str = "appointment";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Option<AppointmentId>,
    pub appointment_time: NaiveDateTime,
    pub reason: Option<String>,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
}

impl Appointment {
    pub fn new(appointment_time: NaiveDateTime, patient_id: PatientId, doctor_id: DoctorId) -> Self {
        Self {
            id: None,
            appointment_time,
            reason: None,
            patient_id,
            doctor_id,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_reference(ENTITY, "patient_id", self.patient_id)?;
        require_reference(ENTITY, "doctor_id", self.doctor_id)?;
        if let Some(reason) = self.reason.as_deref() {
            limit_text(ENTITY, "reason", reason, REASON_MAX_CHARS)?;
        }
        Ok(())
    }
}
