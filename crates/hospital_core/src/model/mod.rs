//! Hospital record model.
//!
//! # Responsibility
//! - Define the record shapes stored by the records store.
//! - Validate field-level constraints before any SQL runs.
//!
//! # Invariants
//! - Identity is assigned by the store; a record built in memory carries
//!   `id: None` until it has been created.
//! - Model types are storage-agnostic; SQL mapping lives in `crate::repo`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod appointment;
pub mod department;
pub mod doctor;
pub mod insurance;
pub mod patient;

/// Store-assigned surrogate key shared by every record kind.
pub type RecordId = i64;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));

/// Field-level validation failure raised before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text is empty/blank or a required value is absent.
    RequiredFieldMissing {
        entity: &'static str,
        field: &'static str,
    },
    /// Text exceeds the column length limit (counted in characters).
    FieldTooLong {
        entity: &'static str,
        field: &'static str,
        max: usize,
        actual: usize,
    },
    /// Email does not have a `local@domain` shape or carries whitespace.
    InvalidEmail { entity: &'static str },
    /// Foreign id is not a valid store identity.
    InvalidReference {
        entity: &'static str,
        field: &'static str,
        id: RecordId,
    },
    /// Record already carries an identity and cannot be created again.
    IdentityAlreadyAssigned { entity: &'static str, id: RecordId },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequiredFieldMissing { entity, field } => {
                write!(f, "{entity}.{field} is required")
            }
            Self::FieldTooLong {
                entity,
                field,
                max,
                actual,
            } => write!(
                f,
                "{entity}.{field} is {actual} characters long; limit is {max}"
            ),
            Self::InvalidEmail { entity } => write!(f, "{entity}.email is not a valid address"),
            Self::InvalidReference { entity, field, id } => {
                write!(f, "{entity}.{field} holds invalid id {id}")
            }
            Self::IdentityAlreadyAssigned { entity, id } => {
                write!(f, "{entity} already has store identity {id}")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    entity: &'static str,
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing { entity, field });
    }
    limit_text(entity, field, value, max)
}

pub(crate) fn limit_text(
    entity: &'static str,
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::FieldTooLong {
            entity,
            field,
            max,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn require_email(
    entity: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    require_text(entity, "email", value, max)?;
    // Checked untrimmed: the value is stored verbatim under UNIQUE(email).
    if !EMAIL_RE.is_match(value) {
        return Err(ValidationError::InvalidEmail { entity });
    }
    Ok(())
}

pub(crate) fn require_reference(
    entity: &'static str,
    field: &'static str,
    id: RecordId,
) -> Result<(), ValidationError> {
    if id <= 0 {
        return Err(ValidationError::InvalidReference { entity, field, id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{limit_text, require_email, require_text, ValidationError};

    #[test]
    fn blank_text_counts_as_missing() {
        let err = require_text("patient", "name", "   ", 40).unwrap_err();
        assert_eq!(
            err,
            ValidationError::RequiredFieldMissing {
                entity: "patient",
                field: "name"
            }
        );
    }

    #[test]
    fn length_limit_counts_characters_not_bytes() {
        assert!(limit_text("patient", "name", "é".repeat(40).as_str(), 40).is_ok());
        assert!(matches!(
            limit_text("patient", "name", "é".repeat(41).as_str(), 40),
            Err(ValidationError::FieldTooLong { actual: 41, .. })
        ));
    }

    #[test]
    fn email_requires_local_and_domain_parts() {
        assert!(require_email("patient", "asha@x.com", 100).is_ok());
        assert_eq!(
            require_email("patient", "asha.x.com", 100),
            Err(ValidationError::InvalidEmail { entity: "patient" })
        );
    }

    #[test]
    fn email_with_surrounding_whitespace_is_rejected() {
        for padded in [" asha@x.com", "asha@x.com ", "\tasha@x.com\n"] {
            assert_eq!(
                require_email("doctor", padded, 100),
                Err(ValidationError::InvalidEmail { entity: "doctor" })
            );
        }
    }
}
