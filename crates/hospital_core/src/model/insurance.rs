//! Insurance policy record.
//!
//! # Invariants
//! - `policy_number` is unique across the store.
//! - `created_at` is assigned by the store at insert and never rewritten.
//! - `patient_id` mirrors the owning patient's foreign key; it is read-only
//!   and never persisted through an insurance write.

use super::patient::PatientId;
use super::{require_text, RecordId, ValidationError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub type InsuranceId = RecordId;

pub const POLICY_NUMBER_MAX_CHARS: usize = 50;
pub const PROVIDER_MAX_CHARS: usize = 100;

const ENTITY: &str = "insurance";

/// Insurance policy exclusively owned by one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insurance {
    pub id: Option<InsuranceId>,
    pub policy_number: String,
    pub provider: String,
    pub valid_until: NaiveDate,
    /// Store-assigned insert time; `None` until created.
    pub created_at: Option<NaiveDateTime>,
    /// Owning patient, when one references this policy.
    pub patient_id: Option<PatientId>,
}

impl Insurance {
    pub fn new(
        policy_number: impl Into<String>,
        provider: impl Into<String>,
        valid_until: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            policy_number: policy_number.into(),
            provider: provider.into(),
            valid_until,
            created_at: None,
            patient_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(
            ENTITY,
            "policy_number",
            &self.policy_number,
            POLICY_NUMBER_MAX_CHARS,
        )?;
        require_text(ENTITY, "provider", &self.provider, PROVIDER_MAX_CHARS)?;
        Ok(())
    }
}
