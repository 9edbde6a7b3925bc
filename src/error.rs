//! Custom error types for the application.
//!
//! This module defines the primary error type, `MonitorError`, for the whole crate.
//! Using the `thiserror` crate, it provides a centralized way to report the few
//! conditions that are allowed to stop a monitoring session.
//!
//! ## Error Hierarchy
//!
//! Most things that go wrong while watching a snapshot file are *not* errors:
//! torn reads, missing files, unparsable fields, shape mismatches, degenerate
//! statistics and all-NaN batches are absorbed by the decoding and session
//! layers and only show up as log diagnostics. `MonitorError` covers the rest:
//!
//! - **`Config`**: Wraps errors from `figment` while loading or extracting the
//!   layered configuration.
//! - **`Configuration`**: Semantic errors found by `MonitorConfig::validate`,
//!   e.g. a zero history capacity or an EMA factor outside `(0, 1]`.
//! - **`Io`**: Wraps `std::io::Error` for I/O that is not part of the polling
//!   protocol (writing JSON frames, reading a config file explicitly).
//! - **`Source`**: The snapshot path kept failing with a structural OS error
//!   (permission denied, path is a directory, ...) for longer than the
//!   configured tolerance.
//! - **`Sink`**: The presentation sink refused a frame or report.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, MonitorError>;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Layered configuration could not be loaded or extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration parsed but holds an invalid value.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// I/O outside the snapshot polling protocol.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot source failed structurally too many times in a row.
    #[error("Snapshot source {path:?} failed {failures} consecutive times: {source}")]
    Source {
        /// Path being polled.
        path: PathBuf,
        /// Number of consecutive structural failures observed.
        failures: u32,
        /// Last OS error.
        #[source]
        source: std::io::Error,
    },

    /// The presentation sink failed.
    #[error("Presentation sink error: {0}")]
    Sink(String),
}

impl From<figment::Error> for MonitorError {
    fn from(value: figment::Error) -> Self {
        MonitorError::Config(Box::new(value))
    }
}

impl MonitorError {
    /// Whether the session may keep running after this error.
    pub fn can_recover(&self) -> bool {
        matches!(self, MonitorError::Sink(_))
    }
}
