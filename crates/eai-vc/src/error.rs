//! # Issuance Error Taxonomy
//!
//! Wire-level error enums for the credential, derivation-origin and consent
//! operations. Variant names are part of the protocol; the HTTP layer maps
//! each one to a status code and a stable machine-readable code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of `prepare_credential` or `get_credential`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueCredentialError {
    /// Service-side defect or unmet precondition (e.g. unconfigured issuer).
    #[error("internal error: {0}")]
    Internal(String),
    /// The signature is not available yet. Retry prepare/get later.
    #[error("signature not found: {0}")]
    SignatureNotFound(String),
    /// The signed id alias failed verification.
    #[error("invalid id alias: {0}")]
    InvalidIdAlias(String),
    /// The subject is known but the attested fact does not hold.
    #[error("unauthorized subject: {0}")]
    UnauthorizedSubject(String),
    /// The subject never registered.
    #[error("unknown subject: {0}")]
    UnknownSubject(String),
    /// The credential spec is not in the catalog or has bad arguments.
    #[error("unsupported credential spec: {0}")]
    UnsupportedCredentialSpec(String),
}

impl IssueCredentialError {
    /// Whether the caller should retry the prepare/get handshake.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SignatureNotFound(_))
    }

    /// Message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Internal(m)
            | Self::SignatureNotFound(m)
            | Self::InvalidIdAlias(m)
            | Self::UnauthorizedSubject(m)
            | Self::UnknownSubject(m)
            | Self::UnsupportedCredentialSpec(m) => m,
        }
    }
}

/// Failure of `derivation_origin`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivationOriginError {
    /// Service-side failure (e.g. unconfigured issuer).
    #[error("internal error: {0}")]
    Internal(String),
    /// The hostname is not one the issuer serves.
    #[error("unsupported origin: {0}")]
    UnsupportedOrigin(String),
}

/// Description attached to ICRC-21 errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icrc21ErrorInfo {
    /// Human-readable reason.
    pub description: String,
}

/// ICRC-21 consent-message failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Icrc21Error {
    /// Failure not covered by the other variants.
    #[error("consent error {error_code}: {description}")]
    GenericError {
        /// Numeric error code.
        error_code: u64,
        /// Human-readable reason.
        description: String,
    },
    /// The request names a call the issuer does not describe.
    #[error("unsupported canister call: {}", .0.description)]
    UnsupportedCanisterCall(Icrc21ErrorInfo),
    /// No consent message exists for the requested credential.
    #[error("consent message unavailable: {}", .0.description)]
    ConsentMessageUnavailable(Icrc21ErrorInfo),
}
