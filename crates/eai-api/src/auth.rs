//! # Caller Authentication
//!
//! Two kinds of callers:
//!
//! - **Administrators** present `Authorization: Bearer {ADMIN_TOKEN}` to
//!   create events, list them with their codes, and configure the issuer.
//!   Extracted as [`AdminAccess`].
//! - **Participants** present their identity-provider-signed alias in the
//!   `X-Id-Alias` header. The verified `id_dapp` is the subject their
//!   registration is stored under. Extracted as [`CallerAlias`].
//!
//! When no admin token is configured every caller is treated as an
//! administrator (local development).

use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use subtle::ConstantTimeEq;

use eai_vc::AliasTuple;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the signed id alias on participant routes.
pub const ID_ALIAS_HEADER: &str = "x-id-alias";

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison so timing does not
/// depend on where the mismatch is.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Check the `Authorization` header against the configured admin token.
pub fn check_admin(headers: &HeaderMap, expected: Option<&str>) -> Result<(), String> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) if constant_time_token_eq(provided, expected) => Ok(()),
            Some(_) => Err("invalid bearer token".into()),
            None => Err("authorization header must use Bearer scheme".into()),
        },
        None => Err("missing authorization header".into()),
    }
}

// ── Extractors ──────────────────────────────────────────────────────────────

/// Proof that the caller holds the admin token.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

#[axum::async_trait]
impl axum::extract::FromRequestParts<AppState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        check_admin(&parts.headers, state.config.admin_token.as_deref())
            .map(|()| AdminAccess)
            .map_err(|reason| {
                tracing::warn!(%reason, "admin authentication failed");
                AppError::Unauthorized(reason)
            })
    }
}

/// Verified alias of the calling participant.
#[derive(Debug, Clone)]
pub struct CallerAlias(pub AliasTuple);

#[axum::async_trait]
impl axum::extract::FromRequestParts<AppState> for CallerAlias {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let alias = parts
            .headers
            .get(ID_ALIAS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::InvalidIdAlias("missing X-Id-Alias header".into()))?;
        let config = state
            .issuer
            .snapshot()
            .ok_or_else(|| AppError::Internal("issuer is not configured".into()))?;
        state
            .verifier
            .verify(alias, &config)
            .map(CallerAlias)
            .map_err(|e| {
                tracing::warn!(error = %e, "id alias rejected");
                AppError::InvalidIdAlias("id alias could not be verified".into())
            })
    }
}
