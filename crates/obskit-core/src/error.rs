//! Shared error type across obskit crates.

use thiserror::Error;

/// Stable error codes, one per error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed or incomplete configuration / options.
    Validation,
    /// A measure with the same effective name already exists.
    NameConflict,
    /// Unknown measure or pending measurement id.
    NotFound,
    /// A required argument was omitted.
    Argument,
    /// Internal bookkeeping is inconsistent.
    InvalidState,
    /// The metrics or tracing backend failed.
    Backend,
}

impl ErrorCode {
    /// String representation used in logs and HTTP bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION",
            ErrorCode::NameConflict => "NAME_CONFLICT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Argument => "ARGUMENT",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::Backend => "BACKEND",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ObsError>;

/// Unified error type used by the metrics and tracer facades.
#[derive(Debug, Error)]
pub enum ObsError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("the measure {0} is already registered")]
    NameConflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("backend: {0}")]
    Backend(String),
}

impl ObsError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ObsError::Validation(_) => ErrorCode::Validation,
            ObsError::NameConflict(_) => ErrorCode::NameConflict,
            ObsError::NotFound(_) => ErrorCode::NotFound,
            ObsError::Argument(_) => ErrorCode::Argument,
            ObsError::InvalidState(_) => ErrorCode::InvalidState,
            ObsError::Backend(_) => ErrorCode::Backend,
        }
    }
}
