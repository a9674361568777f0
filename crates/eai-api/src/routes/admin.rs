//! # Issuer Configuration
//!
//! `PUT /v1/admin/config` replaces the issuer's trust configuration.
//! Idempotent; requires the admin token. Credential and derivation-origin
//! calls fail until this (or `ISSUER_CONFIG` at startup) has run.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::put;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use eai_vc::IssuerConfig;

use crate::auth::AdminAccess;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Request body: the full issuer configuration.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ConfigureRequest {
    /// `{ derivation_origin, idp_ids, idp_root_key (hex), frontend_hostname,
    /// alternative_frontend_hostnames }`
    #[schema(value_type = Object)]
    pub config: IssuerConfig,
}

/// Applied configuration summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfigureResponse {
    pub derivation_origin: String,
    pub frontend_hostnames: Vec<String>,
    pub idp_ids: Vec<String>,
}

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/admin/config", put(configure))
}

/// PUT /v1/admin/config: Replace the issuer configuration.
#[utoipa::path(
    put,
    path = "/v1/admin/config",
    request_body = ConfigureRequest,
    responses(
        (status = 200, description = "Configuration applied", body = ConfigureResponse),
        (status = 401, description = "Missing or invalid admin token", body = crate::error::ErrorBody),
        (status = 422, description = "Structurally invalid configuration", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub(crate) async fn configure(
    State(state): State<AppState>,
    _admin: AdminAccess,
    body: Result<Json<ConfigureRequest>, JsonRejection>,
) -> Result<Json<ConfigureResponse>, AppError> {
    let config = extract_json(body)?.config;
    let response = ConfigureResponse {
        derivation_origin: config.derivation_origin.clone(),
        frontend_hostnames: std::iter::once(config.frontend_hostname.clone())
            .chain(config.alternative_frontend_hostnames.iter().cloned())
            .collect(),
        idp_ids: config.idp_ids.clone(),
    };
    state.issuer.configure(config)?;
    Ok(Json(response))
}
