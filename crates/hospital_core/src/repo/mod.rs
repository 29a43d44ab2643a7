//! Repository layer: one generic CRUD implementation plus per-kind mappings.
//!
//! # Responsibility
//! - Define the generic `Repository` contract and its SQLite implementation.
//! - Keep SQL, cascade rules and constraint mapping inside the persistence
//!   boundary.
//!
//! # Invariants
//! - Writes validate records before any SQL runs.
//! - Repository APIs return semantic errors (`NotFound`,
//!   `UniquenessViolation`, `CascadeFailure` ...) in addition to transport
//!   errors.

pub mod appointment_repo;
pub mod department_repo;
pub mod doctor_repo;
pub mod entity;
pub mod error;
pub mod insurance_repo;
pub mod page;
pub mod patient_repo;
pub mod sqlite_repo;
