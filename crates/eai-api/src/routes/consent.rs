//! # ICRC-21 Consent Messages
//!
//! `POST /v1/consent-message` renders the text shown to a user before they
//! release identity data for a credential. No caller identity is needed.

use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use eai_vc::{
    vc_consent_message, CredentialSpec, Icrc21ConsentInfo, Icrc21ConsentPreferences,
    Icrc21VcConsentMessageRequest,
};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Request body for a consent message.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConsentMessageBody {
    #[schema(value_type = Object)]
    pub credential_spec: CredentialSpec,
    /// `{ "language": "en-US" }`
    #[schema(value_type = Object)]
    pub preferences: Icrc21ConsentPreferences,
}

/// Rendered consent message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConsentInfoBody {
    pub consent_message: String,
    /// Language actually used.
    pub language: String,
}

impl From<Icrc21ConsentInfo> for ConsentInfoBody {
    fn from(info: Icrc21ConsentInfo) -> Self {
        Self {
            consent_message: info.consent_message,
            language: info.language,
        }
    }
}

/// Build the consent router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/consent-message", post(consent_message))
}

/// POST /v1/consent-message: Render a consent message.
#[utoipa::path(
    post,
    path = "/v1/consent-message",
    request_body = ConsentMessageBody,
    responses(
        (status = 200, description = "Consent message", body = ConsentInfoBody),
        (status = 422, description = "No consent message for this credential spec",
            body = crate::error::ErrorBody),
    ),
    tag = "consent"
)]
pub(crate) async fn consent_message(
    body: Result<Json<ConsentMessageBody>, JsonRejection>,
) -> Result<Json<ConsentInfoBody>, AppError> {
    let req = extract_json(body)?;
    let info = vc_consent_message(&Icrc21VcConsentMessageRequest {
        credential_spec: req.credential_spec,
        preferences: req.preferences,
    })?;
    Ok(Json(info.into()))
}
