//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into admission-level APIs.
//! - Keep outer layers decoupled from storage details.

pub mod patient_service;
