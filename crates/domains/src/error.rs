//! # Error
//!
//! Centralized error handling for the corkboard ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No session where one is required
    #[error("login required")]
    Unauthenticated,

    /// Authenticated but not allowed to perform the action
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found (board, section, post)
    #[error("{0} not found")]
    NotFound(String),

    /// Rejected input (bad name, duplicate target, malformed request)
    #[error("{0}")]
    Invalid(String),

    /// Infrastructure failure (I/O, serialization)
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for corkboard logic.
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
