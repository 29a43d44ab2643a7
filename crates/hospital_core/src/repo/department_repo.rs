//! Department table mapping and doctor membership.
//!
//! # Invariants
//! - `doctor_ids` is always loaded with the department.
//! - Create/update replaces the whole membership set inside the write
//!   transaction.

use crate::model::department::{Department, DepartmentId};
use crate::model::doctor::DoctorId;
use crate::model::{RecordId, ValidationError};
use crate::repo::entity::{opt_id, text, Entity, FetchMode};
use crate::repo::error::{map_constraint_error, RepoResult};
use crate::repo::sqlite_repo::SqliteRepository;
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeSet;

pub type SqliteDepartmentRepository<'conn> = SqliteRepository<'conn, Department>;

impl Entity for Department {
    const KIND: &'static str = "department";
    const TABLE: &'static str = "department";
    const SELECT_SQL: &'static str = "SELECT
        dep.id AS id,
        dep.name AS name,
        dep.head_doctor_id AS head_doctor_id
    FROM department dep";
    const ID_COLUMN: &'static str = "dep.id";
    const WRITE_COLUMNS: &'static [&'static str] = &["name", "head_doctor_id"];

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Department::validate(self)
    }

    fn write_values(&self) -> Vec<Value> {
        vec![text(&self.name), opt_id(self.head_doctor_id)]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Department {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            head_doctor_id: row.get("head_doctor_id")?,
            doctor_ids: BTreeSet::new(),
        })
    }

    fn sort_column(key: &str) -> Option<&'static str> {
        match key {
            "id" => Some("dep.id"),
            "name" => Some("dep.name"),
            _ => None,
        }
    }

    fn field_value(&self, column: &str) -> Option<String> {
        match column {
            "name" => Some(self.name.clone()),
            "head_doctor_id" => self.head_doctor_id.map(|id| id.to_string()),
            _ => None,
        }
    }

    fn sync_owned(&self, conn: &Connection, _stored: Option<&Self>) -> RepoResult<()> {
        let Some(id) = self.id else {
            return Ok(());
        };

        conn.execute(
            "DELETE FROM department_doctor WHERE department_id = ?1;",
            [id],
        )?;
        for doctor_id in &self.doctor_ids {
            conn.execute(
                "INSERT INTO department_doctor (department_id, doctor_id) VALUES (?1, ?2);",
                params![id, doctor_id],
            )
            .map_err(|err| {
                map_constraint_error(Self::KIND, err, |column| match column {
                    "doctor_id" => Some(doctor_id.to_string()),
                    _ => None,
                })
            })?;
        }
        Ok(())
    }

    fn delete_dependents(&self, conn: &Connection) -> RepoResult<()> {
        if let Some(id) = self.id {
            conn.execute(
                "DELETE FROM department_doctor WHERE department_id = ?1;",
                [id],
            )?;
        }
        Ok(())
    }

    fn load_relations(&mut self, conn: &Connection, _fetch: FetchMode) -> RepoResult<()> {
        if let Some(id) = self.id {
            self.doctor_ids = member_ids(conn, id)?;
        }
        Ok(())
    }
}

impl SqliteRepository<'_, Department> {
    /// Departments the doctor is a member of, ordered by name.
    pub fn list_for_doctor(&self, doctor_id: DoctorId) -> RepoResult<Vec<Department>> {
        self.query(
            "WHERE dep.id IN (
                SELECT department_id FROM department_doctor WHERE doctor_id = ?1
            )
            ORDER BY dep.name ASC, dep.id ASC;",
            [doctor_id],
        )
    }
}

fn member_ids(conn: &Connection, department_id: DepartmentId) -> RepoResult<BTreeSet<DoctorId>> {
    let mut stmt = conn.prepare(
        "SELECT doctor_id FROM department_doctor WHERE department_id = ?1 ORDER BY doctor_id;",
    )?;
    let mut rows = stmt.query([department_id])?;
    let mut ids = BTreeSet::new();
    while let Some(row) = rows.next()? {
        ids.insert(row.get(0)?);
    }
    Ok(ids)
}
