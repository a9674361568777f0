//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps the protocol error enums from eai-state and eai-vc to HTTP status
//! codes and stable machine-readable codes. Internal error details are
//! logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use eai_state::RegisterError;
use eai_vc::{ConfigError, DerivationOriginError, Icrc21Error, IssueCredentialError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "UNKNOWN_SUBJECT", "SIGNATURE_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context, e.g. `{"retryable": true}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid admin token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Rejected caller input from a registry operation (400).
    #[error("{0}")]
    External(String),

    /// Signature not ready yet; the caller should retry (404).
    #[error("{0}")]
    SignatureNotFound(String),

    /// Id alias failed verification (401).
    #[error("{0}")]
    InvalidIdAlias(String),

    /// Registered subject for whom the attested fact does not hold (403).
    #[error("{0}")]
    UnauthorizedSubject(String),

    /// Subject never registered (404).
    #[error("{0}")]
    UnknownSubject(String),

    /// Credential spec not in the catalog (422).
    #[error("{0}")]
    UnsupportedCredentialSpec(String),

    /// Hostname not served by this issuer (404).
    #[error("unsupported origin: {0}")]
    UnsupportedOrigin(String),

    /// No consent message for the requested credential (422).
    #[error("{0}")]
    ConsentMessageUnavailable(String),

    /// Consent request names an unsupported call (422).
    #[error("{0}")]
    UnsupportedCanisterCall(String),

    /// Generic ICRC-21 failure (400).
    #[error("{description}")]
    ConsentGeneric { error_code: u64, description: String },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::External(_) => (StatusCode::BAD_REQUEST, "EXTERNAL"),
            Self::SignatureNotFound(_) => (StatusCode::NOT_FOUND, "SIGNATURE_NOT_FOUND"),
            Self::InvalidIdAlias(_) => (StatusCode::UNAUTHORIZED, "INVALID_ID_ALIAS"),
            Self::UnauthorizedSubject(_) => (StatusCode::FORBIDDEN, "UNAUTHORIZED_SUBJECT"),
            Self::UnknownSubject(_) => (StatusCode::NOT_FOUND, "UNKNOWN_SUBJECT"),
            Self::UnsupportedCredentialSpec(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNSUPPORTED_CREDENTIAL_SPEC")
            }
            Self::UnsupportedOrigin(_) => (StatusCode::NOT_FOUND, "UNSUPPORTED_ORIGIN"),
            Self::ConsentMessageUnavailable(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "CONSENT_MESSAGE_UNAVAILABLE")
            }
            Self::UnsupportedCanisterCall(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNSUPPORTED_CANISTER_CALL")
            }
            Self::ConsentGeneric { .. } => (StatusCode::BAD_REQUEST, "GENERIC_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::SignatureNotFound(_) => Some(serde_json::json!({ "retryable": true })),
            Self::ConsentGeneric { error_code, .. } => {
                Some(serde_json::json!({ "error_code": error_code }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RegisterError> for AppError {
    fn from(err: RegisterError) -> Self {
        match err {
            RegisterError::Internal(m) => Self::Internal(m),
            RegisterError::External(m) => Self::External(m),
        }
    }
}

impl From<IssueCredentialError> for AppError {
    fn from(err: IssueCredentialError) -> Self {
        match err {
            IssueCredentialError::Internal(m) => Self::Internal(m),
            IssueCredentialError::SignatureNotFound(m) => Self::SignatureNotFound(m),
            IssueCredentialError::InvalidIdAlias(m) => Self::InvalidIdAlias(m),
            IssueCredentialError::UnauthorizedSubject(m) => Self::UnauthorizedSubject(m),
            IssueCredentialError::UnknownSubject(m) => Self::UnknownSubject(m),
            IssueCredentialError::UnsupportedCredentialSpec(m) => {
                Self::UnsupportedCredentialSpec(m)
            }
        }
    }
}

impl From<DerivationOriginError> for AppError {
    fn from(err: DerivationOriginError) -> Self {
        match err {
            DerivationOriginError::Internal(m) => Self::Internal(m),
            DerivationOriginError::UnsupportedOrigin(m) => Self::UnsupportedOrigin(m),
        }
    }
}

impl From<Icrc21Error> for AppError {
    fn from(err: Icrc21Error) -> Self {
        match err {
            Icrc21Error::GenericError {
                error_code,
                description,
            } => Self::ConsentGeneric {
                error_code,
                description,
            },
            Icrc21Error::UnsupportedCanisterCall(info) => {
                Self::UnsupportedCanisterCall(info.description)
            }
            Icrc21Error::ConsentMessageUnavailable(info) => {
                Self::ConsentMessageUnavailable(info.description)
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Validation(err.to_string())
    }
}
