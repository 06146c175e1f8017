//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the mapping from
//! core port errors to HTTP status codes used by every handler.

use crate::config::ConfigError;
use axum::http::StatusCode;
use study_tracker_core::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The HTTP status a port error is reported with.
pub fn port_error_status(error: &PortError) -> StatusCode {
    match error {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Conflict(_) => StatusCode::CONFLICT,
        PortError::Validation(_) => StatusCode::BAD_REQUEST,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts a port error into the `(StatusCode, String)` rejection handlers return.
/// Internal details of unexpected failures are logged by the caller, not echoed.
pub fn port_rejection(error: PortError) -> (StatusCode, String) {
    let status = port_error_status(&error);
    let message = match error {
        PortError::NotFound(m) | PortError::Conflict(m) | PortError::Validation(m) => m,
        PortError::Unauthorized => "Unauthorized".to_string(),
        PortError::Unavailable(_) => "Service temporarily unavailable".to_string(),
        PortError::Unexpected(_) => "Internal server error".to_string(),
    };
    (status, message)
}
