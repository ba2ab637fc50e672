//! Error types for skyvario.
//!
//! This module defines all error types used throughout the skyvario
//! crate. Per-source sensor failures are deliberately non-fatal: the
//! estimator degrades gracefully and keeps publishing whatever fields
//! remain derivable. A stale sample pair (dt <= 0) is not an error at
//! all; it is dropped and logged.

use std::path::PathBuf;
use thiserror::Error;

use crate::sample::SensorKind;

/// The main error type for skyvario operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Sensor Errors ===
    /// The user declined access to a sensor source.
    #[error("permission denied for {0}")]
    PermissionDenied(SensorKind),

    /// A sensor source's hardware or platform API is absent.
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(SensorKind),

    /// A sensor source failed to start or stop.
    #[error(transparent)]
    Source(#[from] crate::source::SourceError),

    // === Calibration Errors ===
    /// MSL calibration was requested before any GPS altitude arrived.
    #[error("MSL calibration unavailable: no GPS altitude received yet")]
    CalibrationUnavailable,

    // === Audio Errors ===
    /// The audio output pipeline failed to initialize or retune.
    #[error("audio output error: {message}")]
    AudioOutput {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Flight Log Errors ===
    /// Failed to open or create the flight log database.
    #[error("failed to open flight log at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A flight log query failed.
    #[error("flight log query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run flight log migrations.
    #[error("flight log migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A flight with the requested id does not exist.
    #[error("flight {id} not found")]
    FlightNotFound {
        /// The requested flight id.
        id: i64,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for skyvario operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new audio output error.
    #[must_use]
    pub fn audio(message: impl Into<String>) -> Self {
        Self::AudioOutput {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a permission denial.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
            || matches!(self, Self::Source(s) if s.is_permission_denied())
    }

    /// Check if this error means MSL calibration cannot run yet.
    #[must_use]
    pub fn is_calibration_unavailable(&self) -> bool {
        matches!(self, Self::CalibrationUnavailable)
    }
}
