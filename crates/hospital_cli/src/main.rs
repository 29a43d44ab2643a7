//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `hospital_core` linkage with a deterministic ping/version check.
//! - When a database is given (argument or `HOSPITAL_DB_PATH`), open it,
//!   print the schema version and the record count of each kind.
//!
//! Exits with code 1 on any failure.

use hospital_core::db::migrations::current_version;
use hospital_core::{
    init_from_config, Appointment, Department, Doctor, Entity, Insurance, Patient, Repository,
    RepoResult, SqliteRepository, StoreConfig,
};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("hospital_core ping={}", hospital_core::ping());
    println!("hospital_core version={}", hospital_core::core_version());

    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(path_arg: Option<String>) -> Result<(), Box<dyn Error>> {
    let mut config = StoreConfig::from_env()?;
    if let Some(path) = path_arg {
        config = config.with_db_path(path);
    }
    init_from_config(&config)?;

    let Some(db_path) = config.db_path() else {
        return Ok(());
    };

    let conn = config.open_db()?;
    info!("event=cli_inspect module=cli status=start");
    println!("db path={}", db_path.display());
    println!("schema version={}", current_version(&conn)?);
    print_count::<Patient>(&conn, &config)?;
    print_count::<Insurance>(&conn, &config)?;
    print_count::<Doctor>(&conn, &config)?;
    print_count::<Department>(&conn, &config)?;
    print_count::<Appointment>(&conn, &config)?;
    Ok(())
}

fn print_count<E: Entity>(conn: &Connection, config: &StoreConfig) -> RepoResult<()> {
    let repo = SqliteRepository::<E>::from_config(conn, config)?;
    println!("{} count={}", E::KIND, repo.count()?);
    Ok(())
}
