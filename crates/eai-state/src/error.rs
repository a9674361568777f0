//! # Registration Errors
//!
//! `RegisterError` is the wire-level failure type of every registry
//! operation (`add_event`, `list_events`, `register`, `get_participant`).
//! `External` is the caller's fault (bad code, duplicate event, unknown
//! participant); `Internal` is the service's (missing event, persistence).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use eai_core::ValidationError;

/// Failure of a registry operation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterError {
    /// Service-side defect or unmet precondition.
    #[error("internal error: {0}")]
    Internal(String),
    /// Rejected caller input.
    #[error("{0}")]
    External(String),
}

impl RegisterError {
    /// Message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Internal(m) | Self::External(m) => m,
        }
    }
}

impl From<ValidationError> for RegisterError {
    fn from(err: ValidationError) -> Self {
        Self::External(err.to_string())
    }
}

/// Failure reading or writing a state snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Filesystem failure.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot contents could not be (de)serialized.
    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Snapshot written by an incompatible version.
    #[error("unsupported snapshot version {found}, expected {expected}")]
    Version {
        /// Version found on disk.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },
    /// The same event name appears more than once.
    #[error("snapshot lists event {0} more than once")]
    DuplicateEvent(String),
}
