//! Doctor record.

use super::{require_email, require_text, RecordId, ValidationError};
use serde::{Deserialize, Serialize};

pub type DoctorId = RecordId;

pub const NAME_MAX_CHARS: usize = 100;
pub const SPECIALIZATION_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 100;

const ENTITY: &str = "doctor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Option<DoctorId>,
    pub name: String,
    pub specialization: String,
    /// Unique across doctors.
    pub email: String,
}

impl Doctor {
    pub fn new(
        name: impl Into<String>,
        specialization: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            specialization: specialization.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(ENTITY, "name", &self.name, NAME_MAX_CHARS)?;
        require_text(
            ENTITY,
            "specialization",
            &self.specialization,
            SPECIALIZATION_MAX_CHARS,
        )?;
        require_email(ENTITY, &self.email, EMAIL_MAX_CHARS)
    }
}
