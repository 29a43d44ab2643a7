use hospital_core::db::migrations::{current_version, latest_version};
use hospital_core::db::{open_db, open_db_in_memory, DbError};
use hospital_core::{RepoError, SqliteDepartmentRepository, SqlitePatientRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_version(&conn).unwrap(), latest_version());
    for table in [
        "patient",
        "insurance",
        "doctor",
        "appointment",
        "department",
        "department_doctor",
    ] {
        assert_schema_object(&conn, "table", table);
    }
    assert_schema_object(&conn, "index", "idx_patient_birth_date");
}

#[test]
fn connections_enforce_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(current_version(&conn_first).unwrap(), latest_version());
    conn_first
        .execute(
            "INSERT INTO doctor (name, specialization, email) VALUES ('Meera Iyer', 'Cardiology', 'meera@x.com');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(current_version(&conn_second).unwrap(), latest_version());
    let doctors: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM doctor;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(doctors, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqlitePatientRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection was accepted"),
    }
}

#[test]
fn repository_rejects_missing_table() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE department_doctor; DROP TABLE department;")
        .unwrap();

    assert!(matches!(
        SqliteDepartmentRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("department"))
    ));
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
