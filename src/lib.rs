//! Credentis
//!
//! Academic record and credential lifecycle engine: converts raw per-subject
//! scores into derived grades and a cumulative CGPA, and manages certificates
//! from creation through hashing, signing and ledger anchoring, with
//! time-limited capability-scoped verification codes for third-party access.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (scores, grades, certificates, codes)
//! - [`crypto`] - Cryptographic utilities (canonical hashing, signing)
//! - [`infra`] - Collaborator interfaces and PostgreSQL implementations
//! - [`service`] - Orchestrators composing domain logic with collaborators
//! - [`ledger`] - Ledger gateway client for certificate anchoring
//! - [`auth`] - Verified caller claims (JWT)
//! - [`api`] - REST API routes

pub mod api;
pub mod auth;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod ledger;
pub mod migrations;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use domain::{
    Capability, Certificate, CertificateKind, CertificateStatus, CgpaSummary, GradeOutcome,
    Hash256, LedgerAnchor, LetterGrade, ScoreRecord, VerificationCode,
};

pub use infra::{EngineError, ErrorKind, Result};
