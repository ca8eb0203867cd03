//! Error type definitions for the tuner-dvr application
//!
//! Typed errors for the store, capture and configuration layers. Web
//! handlers map these onto HTTP status codes at the boundary; range
//! parsing has its own error type next to the parser in `web::range`.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Capture backend errors
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capture backend specific errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The external capture process could not be started
    #[error("Failed to start capture process: {message}")]
    SpawnFailed { message: String },

    /// The external capture process exited non-zero
    #[error("Capture process exited with status {status}")]
    NonZeroExit { status: String },

    /// The per-capture side log could not be created
    #[error("Failed to create capture log {path}: {message}")]
    LogFile { path: String, message: String },
}

impl AppError {
    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
