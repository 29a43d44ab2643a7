//! Per-kind persistence metadata consumed by the generic repository.
//!
//! # Responsibility
//! - Describe how one record kind maps to its table (columns, select shape,
//!   sortable keys).
//! - Provide lifecycle hooks for owned records: cascading writes, orphan
//!   removal, dependent cleanup and relation loading.
//!
//! # Invariants
//! - `SELECT_SQL` has no `WHERE`/`ORDER BY`; the repository appends them.
//! - `write_values()` yields exactly one value per `WRITE_COLUMNS` entry, in
//!   the same order.
//! - Hooks run inside the caller's transaction and must not commit.

use crate::model::{RecordId, ValidationError};
use crate::repo::error::RepoResult;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

/// Whether owned one-to-many collections are loaded with their owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Collections are populated on every read.
    #[default]
    Eager,
    /// Collections stay `None` until loaded explicitly.
    Lazy,
}

impl FetchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "eager" => Some(Self::Eager),
            "lazy" => Some(Self::Lazy),
            _ => None,
        }
    }
}

/// Table mapping and lifecycle hooks for one record kind.
pub trait Entity: Clone {
    /// Kind name used in errors and log events.
    const KIND: &'static str;
    const TABLE: &'static str;
    const SELECT_SQL: &'static str;
    /// Qualified id column as referenced inside `SELECT_SQL`.
    const ID_COLUMN: &'static str;
    /// Columns written on insert/update, excluding `id`.
    const WRITE_COLUMNS: &'static [&'static str];

    fn id(&self) -> Option<RecordId>;
    fn assign_id(&mut self, id: RecordId);
    fn validate(&self) -> Result<(), ValidationError>;
    fn write_values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// Maps a public sort key to a qualified column.
    fn sort_column(key: &str) -> Option<&'static str>;

    /// Attempted value of one column, rendered for error messages.
    fn field_value(&self, column: &str) -> Option<String>;

    /// Writes owned records that the row itself references (runs before the
    /// row insert/update).
    fn persist_owned(&mut self, _conn: &Connection) -> RepoResult<()> {
        Ok(())
    }

    /// Rejects updates that would break ownership rules.
    fn check_update(&self, _stored: &Self) -> RepoResult<()> {
        Ok(())
    }

    /// Reconciles owned records after the row was written. `stored` is the
    /// row state before an update, `None` on create.
    fn sync_owned(&self, _conn: &Connection, _stored: Option<&Self>) -> RepoResult<()> {
        Ok(())
    }

    /// Removes records that reference this row (runs before the row delete).
    fn delete_dependents(&self, _conn: &Connection) -> RepoResult<()> {
        Ok(())
    }

    /// Removes records this row references and exclusively owns (runs after
    /// the row delete).
    fn delete_owned(&self, _conn: &Connection) -> RepoResult<()> {
        Ok(())
    }

    fn load_relations(&mut self, _conn: &Connection, _fetch: FetchMode) -> RepoResult<()> {
        Ok(())
    }
}

pub(crate) fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub(crate) fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text)
}

pub(crate) fn opt_id(value: Option<RecordId>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}
