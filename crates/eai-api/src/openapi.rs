//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the issuer API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Early Adopter Issuer API",
        version = "0.1.0",
        description = "Registers early adopters and event attendees, and issues them verifiable credentials through a two-phase prepare/get handshake."
    ),
    paths(
        // Events
        crate::routes::events::add_event,
        crate::routes::events::list_events,
        // Participants
        crate::routes::participants::register,
        crate::routes::participants::get_participant,
        // Credentials
        crate::routes::credentials::prepare_credential,
        crate::routes::credentials::get_credential,
        // Consent
        crate::routes::consent::consent_message,
        // Origin
        crate::routes::origin::derivation_origin,
        // Admin
        crate::routes::admin::configure,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::events::AddEventRequest,
        crate::routes::events::EventResponse,
        crate::routes::events::ListEventsResponse,
        crate::routes::participants::RegisterEventData,
        crate::routes::participants::RegisterRequest,
        crate::routes::participants::UserEventData,
        crate::routes::participants::EarlyAdopterResponse,
        crate::routes::credentials::PrepareCredentialBody,
        crate::routes::credentials::PreparedCredentialBody,
        crate::routes::credentials::GetCredentialBody,
        crate::routes::credentials::IssuedCredentialBody,
        crate::routes::consent::ConsentMessageBody,
        crate::routes::consent::ConsentInfoBody,
        crate::routes::origin::DerivationOriginRequest,
        crate::routes::origin::DerivationOriginData,
        crate::routes::admin::ConfigureRequest,
        crate::routes::admin::ConfigureResponse,
    )),
    tags(
        (name = "events", description = "Event administration"),
        (name = "participants", description = "Early adopter registration"),
        (name = "credentials", description = "Two-phase credential issuance"),
        (name = "consent", description = "ICRC-21 consent messages"),
        (name = "origin", description = "Derivation origin lookup"),
        (name = "admin", description = "Issuer configuration"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
