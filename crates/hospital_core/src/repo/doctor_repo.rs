//! Doctor table mapping.
//!
//! Deleting a doctor drops its department memberships in the same
//! transaction. A doctor that still heads a department or has appointments
//! cannot be deleted (`ReferenceViolation`).

use crate::model::doctor::Doctor;
use crate::model::{RecordId, ValidationError};
use crate::repo::entity::{text, Entity};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sqlite_repo::SqliteRepository;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};

pub type SqliteDoctorRepository<'conn> = SqliteRepository<'conn, Doctor>;

impl Entity for Doctor {
    const KIND: &'static str = "doctor";
    const TABLE: &'static str = "doctor";
    const SELECT_SQL: &'static str = "SELECT
        d.id AS id,
        d.name AS name,
        d.specialization AS specialization,
        d.email AS email
    FROM doctor d";
    const ID_COLUMN: &'static str = "d.id";
    const WRITE_COLUMNS: &'static [&'static str] = &["name", "specialization", "email"];

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Doctor::validate(self)
    }

    fn write_values(&self) -> Vec<Value> {
        vec![
            text(&self.name),
            text(&self.specialization),
            text(&self.email),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Doctor {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            specialization: row.get("specialization")?,
            email: row.get("email")?,
        })
    }

    fn sort_column(key: &str) -> Option<&'static str> {
        match key {
            "id" => Some("d.id"),
            "name" => Some("d.name"),
            "specialization" => Some("d.specialization"),
            "email" => Some("d.email"),
            _ => None,
        }
    }

    fn field_value(&self, column: &str) -> Option<String> {
        match column {
            "name" => Some(self.name.clone()),
            "specialization" => Some(self.specialization.clone()),
            "email" => Some(self.email.clone()),
            _ => None,
        }
    }

    fn delete_dependents(&self, conn: &Connection) -> RepoResult<()> {
        let Some(id) = self.id else {
            return Ok(());
        };
        conn.execute("DELETE FROM department_doctor WHERE doctor_id = ?1;", [id])
            .map_err(|err| RepoError::cascade(Self::KIND, id, "department_membership", err.into()))?;
        Ok(())
    }
}

impl SqliteRepository<'_, Doctor> {
    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<Doctor>> {
        self.query_one("WHERE d.email = ?1;", [email])
    }
}
