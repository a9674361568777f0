//! # Credential Issuance
//!
//! The two-phase handshake over HTTP:
//!
//! - `POST /v1/credentials/prepare`: Verify alias, spec and fact; request
//!   a signature; return the prepared context.
//! - `POST /v1/credentials/get`: Echo the context back; returns the signed
//!   credential, or `404 SIGNATURE_NOT_FOUND` with `retryable: true` while
//!   the signature is pending.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use eai_vc::{
    CredentialSpec, GetCredentialRequest, IssuedCredentialData, PrepareCredentialRequest,
    PreparedContext, PreparedCredentialData, SignedIdAlias,
};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request body for `prepare`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PrepareCredentialBody {
    /// `{ "credential_jws": "<compact JWS>" }`
    #[schema(value_type = Object)]
    pub signed_id_alias: SignedIdAlias,
    /// `{ "credential_type": "...", "arguments": { ... } }`
    #[schema(value_type = Object)]
    pub credential_spec: CredentialSpec,
}

/// Response body of `prepare`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PreparedCredentialBody {
    /// Base64 continuation to send to `get`.
    #[schema(value_type = Option<String>)]
    pub prepared_context: Option<PreparedContext>,
}

/// Request body for `get`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GetCredentialBody {
    #[schema(value_type = Object)]
    pub signed_id_alias: SignedIdAlias,
    #[schema(value_type = Object)]
    pub credential_spec: CredentialSpec,
    /// Context returned by `prepare`.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub prepared_context: Option<PreparedContext>,
}

/// Response body of `get`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssuedCredentialBody {
    /// Signed credential, compact JWS.
    pub vc_jws: String,
}

impl From<PreparedCredentialData> for PreparedCredentialBody {
    fn from(data: PreparedCredentialData) -> Self {
        Self {
            prepared_context: data.prepared_context,
        }
    }
}

impl From<IssuedCredentialData> for IssuedCredentialBody {
    fn from(data: IssuedCredentialData) -> Self {
        Self {
            vc_jws: data.vc_jws,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the credentials router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/credentials/prepare", post(prepare_credential))
        .route("/v1/credentials/get", post(get_credential))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/credentials/prepare: Phase one of issuance.
#[utoipa::path(
    post,
    path = "/v1/credentials/prepare",
    request_body = PrepareCredentialBody,
    responses(
        (status = 200, description = "Credential prepared", body = PreparedCredentialBody),
        (status = 401, description = "Id alias invalid", body = crate::error::ErrorBody),
        (status = 403, description = "Attested fact does not hold", body = crate::error::ErrorBody),
        (status = 404, description = "Subject never registered", body = crate::error::ErrorBody),
        (status = 422, description = "Unsupported credential spec", body = crate::error::ErrorBody),
    ),
    tag = "credentials"
)]
pub(crate) async fn prepare_credential(
    State(state): State<AppState>,
    body: Result<Json<PrepareCredentialBody>, JsonRejection>,
) -> Result<Json<PreparedCredentialBody>, AppError> {
    let req = extract_json(body)?;
    let credential_type = req.credential_spec.credential_type.clone();
    let prepared = state.engine.prepare_credential(&PrepareCredentialRequest {
        signed_id_alias: req.signed_id_alias,
        credential_spec: req.credential_spec,
    })?;
    state.metrics.record_prepared(&credential_type);
    Ok(Json(prepared.into()))
}

/// POST /v1/credentials/get: Phase two of issuance.
#[utoipa::path(
    post,
    path = "/v1/credentials/get",
    request_body = GetCredentialBody,
    responses(
        (status = 200, description = "Signed credential", body = IssuedCredentialBody),
        (status = 401, description = "Id alias invalid", body = crate::error::ErrorBody),
        (status = 403, description = "Context mismatch or fact no longer holds", body = crate::error::ErrorBody),
        (status = 404, description = "Signature not ready (retryable) or subject unknown",
            body = crate::error::ErrorBody),
        (status = 422, description = "Unsupported credential spec", body = crate::error::ErrorBody),
    ),
    tag = "credentials"
)]
pub(crate) async fn get_credential(
    State(state): State<AppState>,
    body: Result<Json<GetCredentialBody>, JsonRejection>,
) -> Result<Json<IssuedCredentialBody>, AppError> {
    let req = extract_json(body)?;
    let credential_type = req.credential_spec.credential_type.clone();
    let issued = state.engine.get_credential(&GetCredentialRequest {
        signed_id_alias: req.signed_id_alias,
        credential_spec: req.credential_spec,
        prepared_context: req.prepared_context,
    })?;
    state.metrics.record_issued(&credential_type);
    Ok(Json(issued.into()))
}
