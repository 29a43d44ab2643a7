//! Patient record and blood-group vocabulary.
//!
//! # Responsibility
//! - Define the patient aggregate: the row itself, its owned insurance and
//!   its appointment list.
//!
//! # Invariants
//! - `(name, birth_date)` and `email` are unique across patients.
//! - The patient is the owning side of the insurance link.
//! - `appointments` is `None` when the list was not loaded; `Some` means the
//!   list is complete for this patient.

use super::appointment::Appointment;
use super::insurance::Insurance;
use super::{limit_text, require_email, require_text, RecordId, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type PatientId = RecordId;

pub const NAME_MAX_CHARS: usize = 40;
pub const EMAIL_MAX_CHARS: usize = 100;
pub const GENDER_MAX_CHARS: usize = 20;

const ENTITY: &str = "patient";

/// ABO/Rh blood group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A+" => Some(Self::APositive),
            "A-" => Some(Self::ANegative),
            "B+" => Some(Self::BPositive),
            "B-" => Some(Self::BNegative),
            "AB+" => Some(Self::AbPositive),
            "AB-" => Some(Self::AbNegative),
            "O+" => Some(Self::OPositive),
            "O-" => Some(Self::ONegative),
            _ => None,
        }
    }
}

/// Patient aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Option<PatientId>,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub email: String,
    pub gender: Option<String>,
    pub blood_group: Option<BloodGroup>,
    /// Owned policy. Writes through the patient cascade to this record.
    pub insurance: Option<Insurance>,
    pub appointments: Option<Vec<Appointment>>,
}

impl Patient {
    /// Creates an unsaved patient with the two required fields.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            birth_date: None,
            email: email.into(),
            gender: None,
            blood_group: None,
            insurance: None,
            appointments: None,
        }
    }

    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    pub fn with_insurance(mut self, insurance: Insurance) -> Self {
        self.insurance = Some(insurance);
        self
    }

    /// Loaded appointments, or an empty slice when the list was not loaded.
    pub fn appointments(&self) -> &[Appointment] {
        self.appointments.as_deref().unwrap_or(&[])
    }

    /// Validates the patient row and its inline insurance.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(ENTITY, "name", &self.name, NAME_MAX_CHARS)?;
        require_email(ENTITY, &self.email, EMAIL_MAX_CHARS)?;
        if let Some(gender) = self.gender.as_deref() {
            limit_text(ENTITY, "gender", gender, GENDER_MAX_CHARS)?;
        }
        if let Some(insurance) = self.insurance.as_ref() {
            insurance.validate()?;
        }
        Ok(())
    }
}
