//! Core persistence layer for hospital records.
//! This crate is the single source of truth for record invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, PagePolicy, StoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::appointment::{Appointment, AppointmentId};
pub use model::department::{Department, DepartmentId};
pub use model::doctor::{Doctor, DoctorId};
pub use model::insurance::{Insurance, InsuranceId};
pub use model::patient::{BloodGroup, Patient, PatientId};
pub use model::{RecordId, ValidationError};
pub use repo::appointment_repo::SqliteAppointmentRepository;
pub use repo::department_repo::SqliteDepartmentRepository;
pub use repo::doctor_repo::SqliteDoctorRepository;
pub use repo::entity::{Entity, FetchMode};
pub use repo::error::{RepoError, RepoResult};
pub use repo::insurance_repo::SqliteInsuranceRepository;
pub use repo::page::{Page, PageRequest, Sort, SortDirection};
pub use repo::patient_repo::SqlitePatientRepository;
pub use repo::sqlite_repo::{Repository, SqliteRepository};
pub use service::patient_service::{BookAppointmentRequest, PatientService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
