//! # Event Administration
//!
//! - `POST /v1/events`: Create an event with a given or generated join code.
//! - `GET /v1/events`: List events in creation order, codes included.
//!
//! Both require the admin token.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use eai_state::{Event, RegisterError};

use crate::auth::AdminAccess;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request body for event creation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddEventRequest {
    /// Unique event name.
    pub event_name: String,
    /// Join code; 24 random lowercase letters when omitted.
    #[serde(default)]
    pub registration_code: Option<String>,
}

/// A registered event.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub event_name: String,
    pub registration_code: String,
    pub created_timestamp_s: i64,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            event_name: event.name.as_str().to_string(),
            registration_code: event.registration_code.expose().to_string(),
            created_timestamp_s: event.created_at.epoch_secs(),
        }
    }
}

/// Events in creation order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListEventsResponse {
    pub events: Vec<EventResponse>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the events router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/events", get(list_events).post(add_event))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/events: Create an event.
#[utoipa::path(
    post,
    path = "/v1/events",
    request_body = AddEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Duplicate or empty event name, or caller is not an administrator",
            body = crate::error::ErrorBody),
    ),
    tag = "events"
)]
pub(crate) async fn add_event(
    State(state): State<AppState>,
    admin: Result<AdminAccess, AppError>,
    body: Result<Json<AddEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EventResponse>), AppError> {
    if admin.is_err() {
        return Err(RegisterError::External("Only controllers can register events".into()).into());
    }
    let req = extract_json(body)?;
    let event = state
        .registry
        .add_event(&req.event_name, req.registration_code.as_deref())?;
    Ok((StatusCode::CREATED, Json(event.into())))
}

/// GET /v1/events: List events with their join codes.
#[utoipa::path(
    get,
    path = "/v1/events",
    responses(
        (status = 200, description = "Events in creation order", body = ListEventsResponse),
        (status = 401, description = "Missing or invalid admin token", body = crate::error::ErrorBody),
    ),
    tag = "events"
)]
pub(crate) async fn list_events(
    State(state): State<AppState>,
    _admin: AdminAccess,
) -> Json<ListEventsResponse> {
    Json(ListEventsResponse {
        events: state
            .registry
            .list_events()
            .into_iter()
            .map(EventResponse::from)
            .collect(),
    })
}
