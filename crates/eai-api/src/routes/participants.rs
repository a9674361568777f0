//! # Participant Registration
//!
//! - `POST /v1/participants/register`: Register the caller, optionally
//!   joining an event with its code.
//! - `GET /v1/participants/me`: The caller's join time and joined events.
//!
//! The caller is identified by the `X-Id-Alias` header; the verified
//! `id_dapp` is the participant key.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use eai_state::{EventData, Participant};

use crate::auth::CallerAlias;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Event to join while registering.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterEventData {
    pub event_name: String,
    pub registration_code: String,
}

/// Request body for registration.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub event_data: Option<RegisterEventData>,
}

/// An event the participant joined.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserEventData {
    pub event_name: String,
    pub joined_timestamp_s: i64,
}

/// Participant view returned by both endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EarlyAdopterResponse {
    pub joined_timestamp_s: i64,
    pub events: Vec<UserEventData>,
}

impl From<Participant> for EarlyAdopterResponse {
    fn from(participant: Participant) -> Self {
        Self {
            joined_timestamp_s: participant.joined_at.epoch_secs(),
            events: participant
                .joined_events()
                .into_iter()
                .map(|e| UserEventData {
                    event_name: e.event_name.as_str().to_string(),
                    joined_timestamp_s: e.joined_at.epoch_secs(),
                })
                .collect(),
        }
    }
}

/// Build the participants router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/participants/register", post(register))
        .route("/v1/participants/me", get(get_participant))
}

/// POST /v1/participants/register: Register the caller.
#[utoipa::path(
    post,
    path = "/v1/participants/register",
    request_body = RegisterRequest,
    params(("X-Id-Alias" = String, Header, description = "Signed id alias")),
    responses(
        (status = 200, description = "Participant record after registration", body = EarlyAdopterResponse),
        (status = 400, description = "Invalid registration code or event name", body = crate::error::ErrorBody),
        (status = 401, description = "Id alias missing or invalid", body = crate::error::ErrorBody),
    ),
    tag = "participants"
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    CallerAlias(alias): CallerAlias,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<EarlyAdopterResponse>, AppError> {
    let req = extract_json(body)?;
    let participant = state.registry.register(
        &alias.id_dapp,
        req.event_data.map(|e| EventData {
            event_name: e.event_name,
            registration_code: e.registration_code,
        }),
    )?;
    Ok(Json(participant.into()))
}

/// GET /v1/participants/me: The caller's participant record.
#[utoipa::path(
    get,
    path = "/v1/participants/me",
    params(("X-Id-Alias" = String, Header, description = "Signed id alias")),
    responses(
        (status = 200, description = "Participant record", body = EarlyAdopterResponse),
        (status = 400, description = "Caller never registered", body = crate::error::ErrorBody),
        (status = 401, description = "Id alias missing or invalid", body = crate::error::ErrorBody),
    ),
    tag = "participants"
)]
pub(crate) async fn get_participant(
    State(state): State<AppState>,
    CallerAlias(alias): CallerAlias,
) -> Result<Json<EarlyAdopterResponse>, AppError> {
    let participant = state.registry.get_participant(&alias.id_dapp)?;
    Ok(Json(participant.into()))
}
