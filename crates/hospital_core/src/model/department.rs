//! Department record with head doctor and doctor membership.
//!
//! # Invariants
//! - `name` is unique across departments.
//! - A doctor heads at most one department.
//! - `doctor_ids` is a set; the department owns the membership rows.

use super::doctor::DoctorId;
use super::{require_reference, require_text, RecordId, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type DepartmentId = RecordId;

pub const NAME_MAX_CHARS: usize = 100;

const ENTITY: &str = "department";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: Option<DepartmentId>,
    pub name: String,
    pub head_doctor_id: Option<DoctorId>,
    pub doctor_ids: BTreeSet<DoctorId>,
}

impl Department {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            head_doctor_id: None,
            doctor_ids: BTreeSet::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(ENTITY, "name", &self.name, NAME_MAX_CHARS)?;
        if let Some(head) = self.head_doctor_id {
            require_reference(ENTITY, "head_doctor_id", head)?;
        }
        for doctor_id in &self.doctor_ids {
            require_reference(ENTITY, "doctor_ids", *doctor_id)?;
        }
        Ok(())
    }
}
