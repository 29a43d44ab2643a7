//! Generic CRUD repository over SQLite.
//!
//! # Responsibility
//! - Implement create/get/list/update/delete once for every `Entity`.
//! - Run each write as one `IMMEDIATE` transaction, including the owned
//!   records touched by entity hooks.
//!
//! # Invariants
//! - Identity is assigned by SQLite; `create` rejects records that already
//!   carry one.
//! - `update` and `delete` on a missing id return `NotFound` and write
//!   nothing.
//! - A failed step drops the transaction uncommitted, so no partial write is
//!   observable.

use crate::config::StoreConfig;
use crate::db::migrations::latest_version;
use crate::model::{RecordId, ValidationError};
use crate::repo::entity::{Entity, FetchMode};
use crate::repo::error::{map_constraint_error, RepoError, RepoResult};
use crate::repo::page::{Page, PageRequest};
use log::{info, warn};
use rusqlite::{params, params_from_iter, Connection, Params, Transaction, TransactionBehavior};
use std::marker::PhantomData;
use std::time::Instant;

/// Generic CRUD contract shared by every record kind.
pub trait Repository<E: Entity> {
    /// Persists a new record and returns it as stored.
    fn create(&self, record: &E) -> RepoResult<E>;
    /// Loads one record or fails with `NotFound`.
    fn get_by_id(&self, id: RecordId) -> RepoResult<E>;
    /// Loads one record if present.
    fn find_by_id(&self, id: RecordId) -> RepoResult<Option<E>>;
    /// Loads one page plus table totals.
    fn get_all(&self, request: &PageRequest) -> RepoResult<Page<E>>;
    /// Rewrites an existing record and returns it as stored.
    fn update(&self, record: &E) -> RepoResult<E>;
    /// Deletes one record together with everything it owns.
    fn delete(&self, id: RecordId) -> RepoResult<()>;
    fn count(&self) -> RepoResult<u64>;
    fn exists(&self, id: RecordId) -> RepoResult<bool>;
}

/// SQLite-backed repository for one record kind.
pub struct SqliteRepository<'conn, E> {
    conn: &'conn Connection,
    fetch: FetchMode,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: Entity> SqliteRepository<'conn, E> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, E::TABLE, E::WRITE_COLUMNS)?;
        Ok(Self {
            conn,
            fetch: FetchMode::default(),
            _entity: PhantomData,
        })
    }

    /// Creates a repository using the configured appointment fetch mode.
    pub fn from_config(conn: &'conn Connection, config: &StoreConfig) -> RepoResult<Self> {
        Ok(Self::try_new(conn)?.with_fetch_mode(config.appointment_fetch()))
    }

    pub fn with_fetch_mode(mut self, fetch: FetchMode) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch
    }

    pub(crate) fn conn(&self) -> &'conn Connection {
        self.conn
    }

    /// Runs `{SELECT_SQL} {tail}` and loads relations for every row.
    pub(crate) fn query<P: Params>(&self, tail: &str, params: P) -> RepoResult<Vec<E>> {
        let sql = format!("{} {tail}", E::SELECT_SQL);
        query_records(self.conn, &sql, params, self.fetch)
    }

    pub(crate) fn query_one<P: Params>(&self, tail: &str, params: P) -> RepoResult<Option<E>> {
        Ok(self.query(tail, params)?.into_iter().next())
    }

    fn create_in_tx(&self, record: &E) -> RepoResult<E> {
        if let Some(id) = record.id() {
            return Err(ValidationError::IdentityAlreadyAssigned {
                entity: E::KIND,
                id,
            }
            .into());
        }
        record.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut record = record.clone();
        record.persist_owned(&tx)?;
        let id = insert_row(&tx, &record)?;
        record.assign_id(id);
        record.sync_owned(&tx, None)?;
        let stored = load_required::<E>(&tx, id, self.fetch)?;
        tx.commit()?;
        Ok(stored)
    }

    fn update_in_tx(&self, record: &E) -> RepoResult<E> {
        let id = record.id().ok_or(RepoError::MissingIdentity(E::KIND))?;
        record.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let stored = load_row::<E>(&tx, id)?.ok_or(RepoError::NotFound {
            entity: E::KIND,
            id,
        })?;
        record.check_update(&stored)?;

        let mut record = record.clone();
        record.persist_owned(&tx)?;
        update_row(&tx, &record, id)?;
        record.sync_owned(&tx, Some(&stored))?;
        let reloaded = load_required::<E>(&tx, id, self.fetch)?;
        tx.commit()?;
        Ok(reloaded)
    }

    fn delete_in_tx(&self, id: RecordId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let stored = load_row::<E>(&tx, id)?.ok_or(RepoError::NotFound {
            entity: E::KIND,
            id,
        })?;

        stored.delete_dependents(&tx)?;
        tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", E::TABLE),
            [id],
        )
        .map_err(|err| map_constraint_error(E::KIND, err, |column| stored.field_value(column)))?;
        stored.delete_owned(&tx)?;

        tx.commit()?;
        Ok(())
    }

    fn page_in_tx(&self, request: &PageRequest) -> RepoResult<Page<E>> {
        if request.size == 0 {
            return Err(RepoError::InvalidQuery(
                "page size must be at least 1".to_string(),
            ));
        }

        let (column, direction) = match request.sort.as_ref() {
            Some(sort) => {
                let column = E::sort_column(sort.key.as_str()).ok_or_else(|| {
                    RepoError::InvalidQuery(format!(
                        "unknown sort key `{}` for {}",
                        sort.key,
                        E::KIND
                    ))
                })?;
                (column, sort.direction.as_sql())
            }
            None => (E::ID_COLUMN, "ASC"),
        };

        let offset = i64::try_from(u64::from(request.page) * u64::from(request.size))
            .map_err(|_| RepoError::InvalidQuery("page offset overflows".to_string()))?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let total = count_rows(&tx, E::TABLE)?;
        let sql = format!(
            "{} ORDER BY {column} {direction}, {id} ASC LIMIT ?1 OFFSET ?2;",
            E::SELECT_SQL,
            id = E::ID_COLUMN
        );
        let items = query_records::<E, _>(
            &tx,
            &sql,
            params![i64::from(request.size), offset],
            self.fetch,
        )?;
        tx.commit()?;

        Ok(Page::new(items, request.page, request.size, total))
    }
}

impl<E: Entity> Repository<E> for SqliteRepository<'_, E> {
    fn create(&self, record: &E) -> RepoResult<E> {
        let started_at = Instant::now();
        let result = self.create_in_tx(record);
        log_write("record_create", E::KIND, started_at, &result, |stored| {
            stored.id()
        });
        result
    }

    fn get_by_id(&self, id: RecordId) -> RepoResult<E> {
        self.find_by_id(id)?.ok_or(RepoError::NotFound {
            entity: E::KIND,
            id,
        })
    }

    fn find_by_id(&self, id: RecordId) -> RepoResult<Option<E>> {
        self.query_one(&format!("WHERE {} = ?1;", E::ID_COLUMN), [id])
    }

    fn get_all(&self, request: &PageRequest) -> RepoResult<Page<E>> {
        self.page_in_tx(request)
    }

    fn update(&self, record: &E) -> RepoResult<E> {
        let started_at = Instant::now();
        let result = self.update_in_tx(record);
        log_write("record_update", E::KIND, started_at, &result, |stored| {
            stored.id()
        });
        result
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.delete_in_tx(id);
        log_write("record_delete", E::KIND, started_at, &result, |_| Some(id));
        result
    }

    fn count(&self) -> RepoResult<u64> {
        count_rows(self.conn, E::TABLE)
    }

    fn exists(&self, id: RecordId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);", E::TABLE),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

/// Inserts one row and returns the store-assigned id.
pub(crate) fn insert_row<E: Entity>(conn: &Connection, record: &E) -> RepoResult<RecordId> {
    let placeholders = (1..=E::WRITE_COLUMNS.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders});",
        E::TABLE,
        E::WRITE_COLUMNS.join(", ")
    );

    conn.execute(&sql, params_from_iter(record.write_values()))
        .map_err(|err| map_constraint_error(E::KIND, err, |column| record.field_value(column)))?;
    Ok(conn.last_insert_rowid())
}

/// Rewrites the `WRITE_COLUMNS` of one existing row.
pub(crate) fn update_row<E: Entity>(conn: &Connection, record: &E, id: RecordId) -> RepoResult<()> {
    let assignments = E::WRITE_COLUMNS
        .iter()
        .enumerate()
        .map(|(index, column)| format!("{column} = ?{}", index + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {assignments} WHERE id = ?{};",
        E::TABLE,
        E::WRITE_COLUMNS.len() + 1
    );

    let mut values = record.write_values();
    values.push(rusqlite::types::Value::Integer(id));
    let changed = conn
        .execute(&sql, params_from_iter(values))
        .map_err(|err| map_constraint_error(E::KIND, err, |column| record.field_value(column)))?;

    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: E::KIND,
            id,
        });
    }
    Ok(())
}

/// Deletes one row by id without running entity hooks.
pub(crate) fn delete_row_by_id<E: Entity>(conn: &Connection, id: RecordId) -> RepoResult<()> {
    let changed = conn
        .execute(&format!("DELETE FROM {} WHERE id = ?1;", E::TABLE), [id])
        .map_err(|err| map_constraint_error(E::KIND, err, |_| None))?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: E::KIND,
            id,
        });
    }
    Ok(())
}

/// Loads the row alone, without relations.
pub(crate) fn load_row<E: Entity>(conn: &Connection, id: RecordId) -> RepoResult<Option<E>> {
    let sql = format!("{} WHERE {} = ?1;", E::SELECT_SQL, E::ID_COLUMN);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(E::from_row(row)?)),
        None => Ok(None),
    }
}

fn load_required<E: Entity>(conn: &Connection, id: RecordId, fetch: FetchMode) -> RepoResult<E> {
    let mut record = load_row::<E>(conn, id)?.ok_or(RepoError::NotFound {
        entity: E::KIND,
        id,
    })?;
    record.load_relations(conn, fetch)?;
    Ok(record)
}

pub(crate) fn query_records<E: Entity, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    fetch: FetchMode,
) -> RepoResult<Vec<E>> {
    let mut records = {
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(E::from_row(row)?);
        }
        records
    };

    for record in &mut records {
        record.load_relations(conn, fetch)?;
    }
    Ok(records)
}

fn count_rows(conn: &Connection, table: &str) -> RepoResult<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })?;
    u64::try_from(count)
        .map_err(|_| RepoError::InvalidData(format!("negative row count in {table}")))
}

fn log_write<T>(
    event: &str,
    kind: &str,
    started_at: Instant,
    result: &RepoResult<T>,
    id_of: impl Fn(&T) -> Option<RecordId>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(value) => info!(
            "event={event} module=repo status=ok kind={kind} id={} duration_ms={duration_ms}",
            id_of(value).unwrap_or_default()
        ),
        Err(err) => warn!(
            "event={event} module=repo status=error kind={kind} duration_ms={duration_ms} error_code={}",
            err.code()
        ),
    }
}

fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &'static [&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for column in std::iter::once("id").chain(columns.iter().copied()) {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
