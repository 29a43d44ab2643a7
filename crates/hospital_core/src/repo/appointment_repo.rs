//! Appointment table mapping and lookups.
//!
//! # Invariants
//! - An appointment keeps the patient it was created for; moving it to
//!   another patient is rejected with `OwnerReassignment`.
//! - Lists are ordered by `appointment_time ASC, id ASC`.

use crate::model::appointment::Appointment;
use crate::model::doctor::DoctorId;
use crate::model::patient::PatientId;
use crate::model::{RecordId, ValidationError};
use crate::repo::entity::{opt_text, text, Entity, FetchMode};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sqlite_repo::{query_records, SqliteRepository};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};

pub type SqliteAppointmentRepository<'conn> = SqliteRepository<'conn, Appointment>;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const LIST_ORDER: &str = "ORDER BY a.appointment_time ASC, a.id ASC;";

impl Entity for Appointment {
    const KIND: &'static str = "appointment";
    const TABLE: &'static str = "appointment";
    const SELECT_SQL: &'static str = "SELECT
        a.id AS id,
        a.appointment_time AS appointment_time,
        a.reason AS reason,
        a.patient_id AS patient_id,
        a.doctor_id AS doctor_id
    FROM appointment a";
    const ID_COLUMN: &'static str = "a.id";
    const WRITE_COLUMNS: &'static [&'static str] =
        &["appointment_time", "reason", "patient_id", "doctor_id"];

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Appointment::validate(self)
    }

    fn write_values(&self) -> Vec<Value> {
        vec![
            text(&self.appointment_time.format(TIME_FORMAT).to_string()),
            opt_text(self.reason.as_deref()),
            Value::Integer(self.patient_id),
            Value::Integer(self.doctor_id),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Appointment {
            id: Some(row.get("id")?),
            appointment_time: row.get("appointment_time")?,
            reason: row.get("reason")?,
            patient_id: row.get("patient_id")?,
            doctor_id: row.get("doctor_id")?,
        })
    }

    fn sort_column(key: &str) -> Option<&'static str> {
        match key {
            "id" => Some("a.id"),
            "appointment_time" => Some("a.appointment_time"),
            "patient_id" => Some("a.patient_id"),
            "doctor_id" => Some("a.doctor_id"),
            _ => None,
        }
    }

    fn field_value(&self, column: &str) -> Option<String> {
        match column {
            "appointment_time" => Some(self.appointment_time.format(TIME_FORMAT).to_string()),
            "patient_id" => Some(self.patient_id.to_string()),
            "doctor_id" => Some(self.doctor_id.to_string()),
            _ => None,
        }
    }

    fn check_update(&self, stored: &Self) -> RepoResult<()> {
        if stored.patient_id != self.patient_id {
            return Err(RepoError::OwnerReassignment {
                entity: Self::KIND,
                id: self.id.unwrap_or_default(),
                from_owner: stored.patient_id,
                to_owner: self.patient_id,
            });
        }
        Ok(())
    }
}

pub(crate) fn appointments_for_patient(
    conn: &Connection,
    patient_id: PatientId,
) -> RepoResult<Vec<Appointment>> {
    let sql = format!(
        "{} WHERE a.patient_id = ?1 {LIST_ORDER}",
        Appointment::SELECT_SQL
    );
    query_records(conn, &sql, [patient_id], FetchMode::Lazy)
}

impl SqliteRepository<'_, Appointment> {
    pub fn list_for_patient(&self, patient_id: PatientId) -> RepoResult<Vec<Appointment>> {
        appointments_for_patient(self.conn(), patient_id)
    }

    pub fn list_for_doctor(&self, doctor_id: DoctorId) -> RepoResult<Vec<Appointment>> {
        self.query(&format!("WHERE a.doctor_id = ?1 {LIST_ORDER}"), [doctor_id])
    }
}
