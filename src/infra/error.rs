//! Closed error taxonomy for the record and credential engine.
//!
//! Every failure mode is a structured variant compared by shape, never by
//! message text. Validation, not-found, conflict and state errors go back to
//! the caller untouched; external errors carry the failed operation and a
//! retryable tag. The engine performs no silent retries of its own.

use thiserror::Error;

use crate::domain::{Capability, StudentId, SubjectId};

/// Errors surfaced by the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input failed a declared validation rule
    #[error("validation failed for {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Referenced entity is absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A score already exists for this (student, subject, semester)
    #[error("score already exists for student {student_id} in subject {subject_id}, semester {semester}")]
    DuplicateScore {
        student_id: StudentId,
        subject_id: SubjectId,
        semester: String,
    },

    /// Serial number already used within the university
    #[error("serial number already in use: {serial_number}")]
    DuplicateSerialNumber { serial_number: String },

    /// Registration number already used within the university
    #[error("registration number already in use: {registration_number}")]
    DuplicateRegistrationNumber { registration_number: String },

    /// Student already holds a non-revoked certificate of this degree kind
    #[error("student {student_code} already holds a non-revoked {kind} certificate")]
    DuplicateDegree { student_code: String, kind: String },

    /// Operation attempted from an invalid lifecycle state
    #[error("cannot {operation} certificate {certificate_id} in state {from}")]
    State {
        certificate_id: String,
        from: &'static str,
        operation: &'static str,
    },

    /// Verification code is past its expiry
    #[error("verification code expired: {code}")]
    Expired { code: String },

    /// Verification code does not carry the requested capability
    #[error("verification code does not grant {capability}")]
    CapabilityDenied { capability: Capability },

    /// Ledger, blob store or database failure, wrapped with operation
    /// context and tagged retryable or terminal
    #[error("external failure during {operation} (retryable: {retryable}): {message}")]
    External {
        operation: &'static str,
        retryable: bool,
        message: String,
    },
}

/// Stable tag for an [`EngineError`], used by the API layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    State,
    Expired,
    CapabilityDenied,
    External,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation { .. } => ErrorKind::Validation,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::DuplicateScore { .. }
            | EngineError::DuplicateSerialNumber { .. }
            | EngineError::DuplicateRegistrationNumber { .. }
            | EngineError::DuplicateDegree { .. } => ErrorKind::Conflict,
            EngineError::State { .. } => ErrorKind::State,
            EngineError::Expired { .. } => ErrorKind::Expired,
            EngineError::CapabilityDenied { .. } => ErrorKind::CapabilityDenied,
            EngineError::External { .. } => ErrorKind::External,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Whether the caller may safely retry the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::External { retryable: true, .. })
    }

    /// External failure helper with operation context
    pub fn external(
        operation: &'static str,
        retryable: bool,
        message: impl Into<String>,
    ) -> Self {
        EngineError::External {
            operation,
            retryable,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
