//! Result and error types for Probar Gate.

use crate::threshold::ThresholdViolation;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for Probar Gate operations
pub type GateResult<T> = Result<T, GateError>;

/// Errors that can occur while aggregating and gating coverage
#[derive(Debug, Error)]
pub enum GateError {
    /// A per-file coverage payload was malformed
    #[error("Malformed coverage payload: {message}")]
    MergeDecode {
        /// Error message
        message: String,
    },

    /// An in-scope file could not be read or synthesized
    #[error("Failed to collect coverage from {}: {message}", path.display())]
    ReconcileRead {
        /// File that was skipped
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A report writer failed
    #[error("Report writer '{writer}' failed: {message}")]
    ReportWrite {
        /// Writer name
        writer: String,
        /// Error message
        message: String,
    },

    /// One or more coverage thresholds were not met
    #[error("Coverage thresholds not met ({} violation(s))", violations.len())]
    ThresholdsNotMet {
        /// Every violation found for the evaluated scope
        violations: Vec<ThresholdViolation>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl GateError {
    /// Create a merge decode error
    #[must_use]
    pub fn merge_decode(message: impl Into<String>) -> Self {
        Self::MergeDecode {
            message: message.into(),
        }
    }

    /// Create a reconcile read error
    #[must_use]
    pub fn reconcile_read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ReconcileRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a report write error
    #[must_use]
    pub fn report_write(writer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReportWrite {
            writer: writer.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error fails the run
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ThresholdsNotMet { .. })
    }
}
