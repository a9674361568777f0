//! # Error Types
//!
//! Leaf error hierarchy shared across the workspace. Protocol-facing error
//! enums (`RegisterError`, `IssueCredentialError`, ...) live next to the
//! components that produce them; this module only carries failures that
//! can happen before any protocol logic runs.

use thiserror::Error;

/// Top-level error type for foundational operations.
#[derive(Error, Debug)]
pub enum EaiError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Identifier or value failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation failure for a domain identifier or timestamp.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required string field was empty or whitespace.
    #[error("{field} cannot be an empty string")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A string field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters, got {actual}")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted length.
        max: usize,
        /// Actual length.
        actual: usize,
    },

    /// A timestamp could not be parsed or is out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_display_names_field() {
        let err = ValidationError::Empty { field: "event_name" };
        assert_eq!(err.to_string(), "event_name cannot be an empty string");
    }

    #[test]
    fn too_long_display() {
        let err = ValidationError::TooLong {
            field: "event_name",
            max: 10,
            actual: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn validation_converts_into_top_level() {
        let err: EaiError = ValidationError::Empty { field: "x" }.into();
        assert!(matches!(err, EaiError::Validation(_)));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = EaiError::from(io_err);
        assert!(format!("{err}").contains("file missing"));
    }
}
