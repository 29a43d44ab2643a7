//! Insurance table mapping and lookups.
//!
//! # Invariants
//! - `created_at` is filled by the column default at insert and is not part
//!   of `WRITE_COLUMNS`, so updates never rewrite it.
//! - The owning patient id is read through a join and never written here.

use crate::model::insurance::{Insurance, InsuranceId};
use crate::model::patient::PatientId;
use crate::model::{RecordId, ValidationError};
use crate::repo::entity::{text, Entity};
use crate::repo::error::RepoResult;
use crate::repo::sqlite_repo::SqliteRepository;
use rusqlite::types::Value;
use rusqlite::Row;

pub type SqliteInsuranceRepository<'conn> = SqliteRepository<'conn, Insurance>;

impl Entity for Insurance {
    const KIND: &'static str = "insurance";
    const TABLE: &'static str = "insurance";
    const SELECT_SQL: &'static str = "SELECT
        i.id AS insurance_id,
        i.policy_number AS insurance_policy_number,
        i.provider AS insurance_provider,
        i.valid_until AS insurance_valid_until,
        i.created_at AS insurance_created_at,
        p.id AS insurance_patient_id
    FROM insurance i
    LEFT JOIN patient p ON p.patient_insurance_id = i.id";
    const ID_COLUMN: &'static str = "i.id";
    const WRITE_COLUMNS: &'static [&'static str] = &["policy_number", "provider", "valid_until"];

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Insurance::validate(self)
    }

    fn write_values(&self) -> Vec<Value> {
        vec![
            text(&self.policy_number),
            text(&self.provider),
            text(&self.valid_until.to_string()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let owner: Option<PatientId> = row.get("insurance_patient_id")?;
        insurance_from_row(row, owner)
    }

    fn sort_column(key: &str) -> Option<&'static str> {
        match key {
            "id" => Some("i.id"),
            "policy_number" => Some("i.policy_number"),
            "provider" => Some("i.provider"),
            "valid_until" => Some("i.valid_until"),
            "created_at" => Some("i.created_at"),
            _ => None,
        }
    }

    fn field_value(&self, column: &str) -> Option<String> {
        match column {
            "policy_number" => Some(self.policy_number.clone()),
            "provider" => Some(self.provider.clone()),
            "valid_until" => Some(self.valid_until.to_string()),
            _ => None,
        }
    }
}

/// Reads the `insurance_*` column aliases shared by insurance and patient
/// selects.
pub(crate) fn insurance_from_row(row: &Row<'_>, owner: Option<PatientId>) -> RepoResult<Insurance> {
    let id: InsuranceId = row.get("insurance_id")?;
    Ok(Insurance {
        id: Some(id),
        policy_number: row.get("insurance_policy_number")?,
        provider: row.get("insurance_provider")?,
        valid_until: row.get("insurance_valid_until")?,
        created_at: Some(row.get("insurance_created_at")?),
        patient_id: owner,
    })
}

impl SqliteRepository<'_, Insurance> {
    /// Looks up a policy by its unique policy number.
    pub fn find_by_policy_number(&self, policy_number: &str) -> RepoResult<Option<Insurance>> {
        self.query_one("WHERE i.policy_number = ?1;", [policy_number])
    }
}
