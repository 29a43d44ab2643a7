//! Repository error taxonomy and SQLite constraint mapping.
//!
//! # Invariants
//! - Constraint failures raised by the storage engine surface as typed
//!   errors (`UniquenessViolation`, `RequiredFieldMissing`,
//!   `ReferenceViolation`), never as raw SQLite errors.
//! - A failed cascade step surfaces as `CascadeFailure`; the caller's
//!   transaction is rolled back.

use crate::db::DbError;
use crate::model::{RecordId, ValidationError};
use rusqlite::ffi;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error returned by every repository operation.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Field-level validation failed before any write.
    Validation(ValidationError),
    /// The referenced record does not exist.
    NotFound { entity: &'static str, id: RecordId },
    /// Update was called on a record without store identity.
    MissingIdentity(&'static str),
    /// A unique constraint rejected the write.
    UniquenessViolation {
        entity: &'static str,
        fields: Vec<String>,
        value: String,
    },
    /// A required column was missing.
    RequiredFieldMissing { entity: &'static str, field: String },
    /// A foreign key rejected the write or delete.
    ReferenceViolation { entity: &'static str, detail: String },
    /// A dependent record was moved to another owner.
    OwnerReassignment {
        entity: &'static str,
        id: RecordId,
        from_owner: RecordId,
        to_owner: RecordId,
    },
    /// One step of a cascading write/delete failed; nothing was committed.
    CascadeFailure {
        entity: &'static str,
        id: RecordId,
        step: &'static str,
        source: Box<RepoError>,
    },
    /// Page/sort parameters cannot be executed.
    InvalidQuery(String),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    pub(crate) fn cascade(
        entity: &'static str,
        id: RecordId,
        step: &'static str,
        source: RepoError,
    ) -> Self {
        Self::CascadeFailure {
            entity,
            id,
            step,
            source: Box::new(source),
        }
    }

    /// Stable machine-readable code, used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Db(_) => "db_error",
            Self::Validation(_) => "validation_failed",
            Self::NotFound { .. } => "not_found",
            Self::MissingIdentity(_) => "missing_identity",
            Self::UniquenessViolation { .. } => "uniqueness_violation",
            Self::RequiredFieldMissing { .. } => "required_field_missing",
            Self::ReferenceViolation { .. } => "reference_violation",
            Self::OwnerReassignment { .. } => "owner_reassignment",
            Self::CascadeFailure { .. } => "cascade_failure",
            Self::InvalidQuery(_) => "invalid_query",
            Self::InvalidData(_) => "invalid_data",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
            Self::MissingRequiredTable(_) => "missing_required_table",
            Self::MissingRequiredColumn { .. } => "missing_required_column",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::MissingIdentity(entity) => {
                write!(f, "{entity} has no store identity; create it first")
            }
            Self::UniquenessViolation {
                entity,
                fields,
                value,
            } => write!(
                f,
                "{entity} with {} = `{value}` already exists",
                fields.join(", ")
            ),
            Self::RequiredFieldMissing { entity, field } => {
                write!(f, "{entity}.{field} is required")
            }
            Self::ReferenceViolation { entity, detail } => {
                write!(f, "{entity} reference violation: {detail}")
            }
            Self::OwnerReassignment {
                entity,
                id,
                from_owner,
                to_owner,
            } => write!(
                f,
                "{entity} {id} belongs to {from_owner} and cannot move to {to_owner}"
            ),
            Self::CascadeFailure {
                entity,
                id,
                step,
                source,
            } => write!(f, "cascade `{step}` for {entity} {id} failed: {source}"),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "records repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "records repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "records repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::CascadeFailure { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::RequiredFieldMissing { entity, field } => Self::RequiredFieldMissing {
                entity,
                field: field.to_string(),
            },
            other => Self::Validation(other),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Converts a write failure into a typed constraint error when possible.
///
/// `field_value` resolves the attempted value of a column so uniqueness
/// errors can name the conflicting value.
pub(crate) fn map_constraint_error(
    entity: &'static str,
    err: rusqlite::Error,
    field_value: impl Fn(&str) -> Option<String>,
) -> RepoError {
    let (extended_code, message) = match &err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            (failure.extended_code, message.as_deref().unwrap_or(""))
        }
        _ => return err.into(),
    };

    match extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            let fields = constraint_columns(message);
            let value = fields
                .iter()
                .map(|field| field_value(field).unwrap_or_else(|| "NULL".to_string()))
                .collect::<Vec<_>>()
                .join(", ");
            RepoError::UniquenessViolation {
                entity,
                fields,
                value,
            }
        }
        ffi::SQLITE_CONSTRAINT_NOTNULL => RepoError::RequiredFieldMissing {
            entity,
            field: constraint_columns(message)
                .into_iter()
                .next()
                .unwrap_or_default(),
        },
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => RepoError::ReferenceViolation {
            entity,
            detail: message.to_string(),
        },
        _ => err.into(),
    }
}

/// Extracts column names from messages such as
/// `UNIQUE constraint failed: patient.name, patient.birth_date`.
fn constraint_columns(message: &str) -> Vec<String> {
    let Some((_, columns)) = message.split_once(": ") else {
        return Vec::new();
    };
    columns
        .split(',')
        .map(|column| {
            let column = column.trim();
            column
                .split_once('.')
                .map_or(column, |(_, name)| name)
                .to_string()
        })
        .filter(|column| !column.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{constraint_columns, RepoError};
    use crate::model::ValidationError;

    #[test]
    fn constraint_columns_strips_table_prefix() {
        assert_eq!(
            constraint_columns("UNIQUE constraint failed: patient.name, patient.birth_date"),
            vec!["name".to_string(), "birth_date".to_string()]
        );
        assert!(constraint_columns("FOREIGN KEY constraint failed").is_empty());
    }

    #[test]
    fn required_field_validation_maps_to_required_field_missing() {
        let err: RepoError = ValidationError::RequiredFieldMissing {
            entity: "patient",
            field: "email",
        }
        .into();
        assert!(matches!(
            err,
            RepoError::RequiredFieldMissing { entity: "patient", ref field } if field == "email"
        ));
        assert_eq!(err.code(), "required_field_missing");
    }
}
