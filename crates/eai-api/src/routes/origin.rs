//! # Derivation Origin
//!
//! `POST /v1/derivation-origin` maps a frontend hostname to the origin its
//! identity aliases must be scoped to.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DerivationOriginRequest {
    pub frontend_hostname: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DerivationOriginData {
    pub origin: String,
}

/// Build the derivation-origin router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/derivation-origin", post(derivation_origin))
}

/// POST /v1/derivation-origin: Resolve the derivation origin for a hostname.
#[utoipa::path(
    post,
    path = "/v1/derivation-origin",
    request_body = DerivationOriginRequest,
    responses(
        (status = 200, description = "Derivation origin", body = DerivationOriginData),
        (status = 404, description = "Hostname not served by this issuer", body = crate::error::ErrorBody),
        (status = 500, description = "Issuer not configured", body = crate::error::ErrorBody),
    ),
    tag = "origin"
)]
pub(crate) async fn derivation_origin(
    State(state): State<AppState>,
    body: Result<Json<DerivationOriginRequest>, JsonRejection>,
) -> Result<Json<DerivationOriginData>, AppError> {
    let req = extract_json(body)?;
    let origin = state.issuer.derivation_origin(&req.frontend_hostname)?;
    Ok(Json(DerivationOriginData { origin }))
}
