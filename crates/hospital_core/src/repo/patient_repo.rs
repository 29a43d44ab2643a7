//! Patient table mapping, cascade rules and patient lookups.
//!
//! # Responsibility
//! - Persist the owned insurance together with the patient row.
//! - Remove orphaned insurance and appointments on update.
//! - Delete appointments, the patient row and its insurance as one unit.
//!
//! # Invariants
//! - Insurance is written before the patient row (the patient holds the
//!   foreign key) and deleted after it.
//! - Appointments are deleted before the patient row; the delete is verified
//!   before the patient row goes.
//! - Appointments listed on a patient without an id are not persisted here;
//!   they are created through the appointment repository.

use crate::model::appointment::{Appointment, AppointmentId};
use crate::model::insurance::Insurance;
use crate::model::patient::{BloodGroup, Patient, PatientId};
use crate::model::{RecordId, ValidationError};
use crate::repo::appointment_repo::appointments_for_patient;
use crate::repo::entity::{opt_id, opt_text, text, Entity, FetchMode};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::insurance_repo::insurance_from_row;
use crate::repo::sqlite_repo::{delete_row_by_id, insert_row, update_row, SqliteRepository};
use chrono::NaiveDate;
use log::info;
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeSet;

pub type SqlitePatientRepository<'conn> = SqliteRepository<'conn, Patient>;

impl Entity for Patient {
    const KIND: &'static str = "patient";
    const TABLE: &'static str = "patient";
    const SELECT_SQL: &'static str = "SELECT
        p.id AS id,
        p.name AS name,
        p.birth_date AS birth_date,
        p.email AS email,
        p.gender AS gender,
        p.blood_group AS blood_group,
        i.id AS insurance_id,
        i.policy_number AS insurance_policy_number,
        i.provider AS insurance_provider,
        i.valid_until AS insurance_valid_until,
        i.created_at AS insurance_created_at
    FROM patient p
    LEFT JOIN insurance i ON i.id = p.patient_insurance_id";
    const ID_COLUMN: &'static str = "p.id";
    const WRITE_COLUMNS: &'static [&'static str] = &[
        "name",
        "birth_date",
        "email",
        "gender",
        "blood_group",
        "patient_insurance_id",
    ];

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Patient::validate(self)
    }

    fn write_values(&self) -> Vec<Value> {
        vec![
            text(&self.name),
            opt_text(self.birth_date.map(|date| date.to_string()).as_deref()),
            text(&self.email),
            opt_text(self.gender.as_deref()),
            opt_text(self.blood_group.map(BloodGroup::as_str)),
            opt_id(self.insurance.as_ref().and_then(|insurance| insurance.id)),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let id: PatientId = row.get("id")?;

        let blood_group = match row.get::<_, Option<String>>("blood_group")? {
            Some(value) => Some(BloodGroup::parse(&value).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid blood group `{value}` in patient.blood_group"
                ))
            })?),
            None => None,
        };

        let insurance = match row.get::<_, Option<RecordId>>("insurance_id")? {
            Some(_) => Some(insurance_from_row(row, Some(id))?),
            None => None,
        };

        Ok(Patient {
            id: Some(id),
            name: row.get("name")?,
            birth_date: row.get("birth_date")?,
            email: row.get("email")?,
            gender: row.get("gender")?,
            blood_group,
            insurance,
            appointments: None,
        })
    }

    fn sort_column(key: &str) -> Option<&'static str> {
        match key {
            "id" => Some("p.id"),
            "name" => Some("p.name"),
            "birth_date" => Some("p.birth_date"),
            "email" => Some("p.email"),
            _ => None,
        }
    }

    fn field_value(&self, column: &str) -> Option<String> {
        match column {
            "name" => Some(self.name.clone()),
            "birth_date" => self.birth_date.map(|date| date.to_string()),
            "email" => Some(self.email.clone()),
            "patient_insurance_id" => self
                .insurance
                .as_ref()
                .and_then(|insurance| insurance.id)
                .map(|id| id.to_string()),
            _ => None,
        }
    }

    fn persist_owned(&mut self, conn: &Connection) -> RepoResult<()> {
        if let Some(insurance) = self.insurance.as_mut() {
            match insurance.id {
                Some(id) => update_row(conn, insurance, id)?,
                None => {
                    let id = insert_row(conn, insurance)?;
                    insurance.assign_id(id);
                }
            }
        }
        Ok(())
    }

    fn sync_owned(&self, conn: &Connection, stored: Option<&Self>) -> RepoResult<()> {
        let (Some(stored), Some(id)) = (stored, self.id) else {
            return Ok(());
        };

        let previous = stored.insurance.as_ref().and_then(|insurance| insurance.id);
        let current = self.insurance.as_ref().and_then(|insurance| insurance.id);
        if let Some(previous) = previous.filter(|previous| current != Some(*previous)) {
            delete_row_by_id::<Insurance>(conn, previous).map_err(|err| {
                RepoError::cascade(Self::KIND, id, "insurance_orphan_removal", err)
            })?;
        }

        if let Some(kept) = self.appointments.as_ref() {
            let kept: BTreeSet<AppointmentId> =
                kept.iter().filter_map(|appointment| appointment.id).collect();
            for appointment_id in appointment_ids_for_patient(conn, id)? {
                if kept.contains(&appointment_id) {
                    continue;
                }
                delete_row_by_id::<Appointment>(conn, appointment_id).map_err(|err| {
                    RepoError::cascade(Self::KIND, id, "appointment_orphan_removal", err)
                })?;
            }
        }

        Ok(())
    }

    fn delete_dependents(&self, conn: &Connection) -> RepoResult<()> {
        let Some(id) = self.id else {
            return Ok(());
        };

        let removed = conn
            .execute("DELETE FROM appointment WHERE patient_id = ?1;", [id])
            .map_err(|err| RepoError::cascade(Self::KIND, id, "appointments", err.into()))?;

        let remaining = appointment_ids_for_patient(conn, id)?.len();
        if remaining > 0 {
            return Err(RepoError::cascade(
                Self::KIND,
                id,
                "appointments",
                RepoError::InvalidData(format!(
                    "{remaining} appointments still reference the patient"
                )),
            ));
        }

        info!("event=cascade_delete module=repo status=ok kind=patient step=appointments removed={removed}");
        Ok(())
    }

    fn delete_owned(&self, conn: &Connection) -> RepoResult<()> {
        let (Some(id), Some(insurance_id)) = (
            self.id,
            self.insurance.as_ref().and_then(|insurance| insurance.id),
        ) else {
            return Ok(());
        };

        delete_row_by_id::<Insurance>(conn, insurance_id)
            .map_err(|err| RepoError::cascade(Self::KIND, id, "insurance", err))?;
        info!("event=cascade_delete module=repo status=ok kind=patient step=insurance removed=1");
        Ok(())
    }

    fn load_relations(&mut self, conn: &Connection, fetch: FetchMode) -> RepoResult<()> {
        if fetch == FetchMode::Eager {
            if let Some(id) = self.id {
                self.appointments = Some(appointments_for_patient(conn, id)?);
            }
        }
        Ok(())
    }
}

impl SqliteRepository<'_, Patient> {
    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<Patient>> {
        self.query_one("WHERE p.email = ?1;", [email])
    }

    pub fn find_by_name_and_birth_date(
        &self,
        name: &str,
        birth_date: NaiveDate,
    ) -> RepoResult<Option<Patient>> {
        self.query_one(
            "WHERE p.name = ?1 AND p.birth_date = ?2;",
            params![name, birth_date.to_string()],
        )
    }

    /// Patients born within `[from, to]`, ordered by birth date then id.
    ///
    /// Served by `idx_patient_birth_date`. Patients without a birth date are
    /// never returned.
    pub fn find_born_between(&self, from: NaiveDate, to: NaiveDate) -> RepoResult<Vec<Patient>> {
        if from > to {
            return Err(RepoError::InvalidQuery(format!(
                "birth date range start {from} is after end {to}"
            )));
        }
        self.query(
            "WHERE p.birth_date BETWEEN ?1 AND ?2 ORDER BY p.birth_date ASC, p.id ASC;",
            params![from.to_string(), to.to_string()],
        )
    }

    /// Populates `patient.appointments` regardless of the fetch mode.
    pub fn load_appointments(&self, patient: &mut Patient) -> RepoResult<()> {
        let id = patient.id.ok_or(RepoError::MissingIdentity(Patient::KIND))?;
        patient.appointments = Some(appointments_for_patient(self.conn(), id)?);
        Ok(())
    }
}

fn appointment_ids_for_patient(
    conn: &Connection,
    patient_id: PatientId,
) -> RepoResult<Vec<AppointmentId>> {
    let mut stmt = conn.prepare("SELECT id FROM appointment WHERE patient_id = ?1 ORDER BY id;")?;
    let mut rows = stmt.query([patient_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}
