//! Structured API error responses with stable error codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infra::EngineError;

/// Machine-readable error codes.
///
/// These are stable; clients branch on them, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authorization (1xxx)
    InsufficientPermissions,

    // Validation (3xxx)
    ValidationFailed,

    // Resource (4xxx)
    ResourceNotFound,

    // Conflict (5xxx)
    DuplicateScore,
    DuplicateSerialNumber,
    DuplicateRegistrationNumber,
    DuplicateDegree,

    // Verification codes (6xxx)
    CodeExpired,
    CapabilityDenied,

    // Lifecycle (7xxx)
    InvalidStateTransition,

    // External collaborators (8xxx)
    ExternalFailure,
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::InsufficientPermissions => 1001,
            ErrorCode::ValidationFailed => 3001,
            ErrorCode::ResourceNotFound => 4001,
            ErrorCode::DuplicateScore => 5001,
            ErrorCode::DuplicateSerialNumber => 5002,
            ErrorCode::DuplicateRegistrationNumber => 5003,
            ErrorCode::DuplicateDegree => 5004,
            ErrorCode::CodeExpired => 6001,
            ErrorCode::CapabilityDenied => 6002,
            ErrorCode::InvalidStateTransition => 7001,
            ErrorCode::ExternalFailure => 8001,
            ErrorCode::ServiceUnavailable => 8002,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InsufficientPermissions => StatusCode::FORBIDDEN,
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::ResourceNotFound => StatusCode::NOT_FOUND,
            ErrorCode::DuplicateScore
            | ErrorCode::DuplicateSerialNumber
            | ErrorCode::DuplicateRegistrationNumber
            | ErrorCode::DuplicateDegree => StatusCode::CONFLICT,
            ErrorCode::CodeExpired => StatusCode::GONE,
            ErrorCode::CapabilityDenied => StatusCode::FORBIDDEN,
            ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
            ErrorCode::ExternalFailure => StatusCode::BAD_GATEWAY,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::DuplicateScore => "DUPLICATE_SCORE",
            ErrorCode::DuplicateSerialNumber => "DUPLICATE_SERIAL_NUMBER",
            ErrorCode::DuplicateRegistrationNumber => "DUPLICATE_REGISTRATION_NUMBER",
            ErrorCode::DuplicateDegree => "DUPLICATE_DEGREE",
            ErrorCode::CodeExpired => "CODE_EXPIRED",
            ErrorCode::CapabilityDenied => "CAPABILITY_DENIED",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::ExternalFailure => "EXTERNAL_FAILURE",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,

    /// Whether the caller may retry the request as-is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                retryable: None,
            },
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.error.retryable = Some(retryable);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match &err {
            EngineError::Validation { .. } => ApiError::new(ErrorCode::ValidationFailed, message),
            EngineError::NotFound { .. } => ApiError::new(ErrorCode::ResourceNotFound, message),
            EngineError::DuplicateScore { .. } => ApiError::new(ErrorCode::DuplicateScore, message),
            EngineError::DuplicateSerialNumber { .. } => {
                ApiError::new(ErrorCode::DuplicateSerialNumber, message)
            }
            EngineError::DuplicateRegistrationNumber { .. } => {
                ApiError::new(ErrorCode::DuplicateRegistrationNumber, message)
            }
            EngineError::DuplicateDegree { .. } => {
                ApiError::new(ErrorCode::DuplicateDegree, message)
            }
            EngineError::State { .. } => ApiError::new(ErrorCode::InvalidStateTransition, message),
            EngineError::Expired { .. } => ApiError::new(ErrorCode::CodeExpired, message),
            EngineError::CapabilityDenied { .. } => {
                ApiError::new(ErrorCode::CapabilityDenied, message)
            }
            EngineError::External { retryable, .. } => {
                let code = if *retryable {
                    ErrorCode::ServiceUnavailable
                } else {
                    ErrorCode::ExternalFailure
                };
                ApiError::new(code, message).with_retryable(*retryable)
            }
        }
    }
}
