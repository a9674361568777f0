//! # eai-api: HTTP Service for the Early Adopter Issuer
//!
//! Exposes the issuer's operations over Axum.
//!
//! ## API Surface
//!
//! | Route                            | Module                      | Caller        |
//! |----------------------------------|-----------------------------|---------------|
//! | `POST /v1/events`                | [`routes::events`]          | Admin         |
//! | `GET /v1/events`                 | [`routes::events`]          | Admin         |
//! | `POST /v1/participants/register` | [`routes::participants`]    | Participant   |
//! | `GET /v1/participants/me`        | [`routes::participants`]    | Participant   |
//! | `POST /v1/credentials/prepare`   | [`routes::credentials`]     | Anyone        |
//! | `POST /v1/credentials/get`       | [`routes::credentials`]     | Anyone        |
//! | `POST /v1/consent-message`       | [`routes::consent`]         | Anyone        |
//! | `POST /v1/derivation-origin`     | [`routes::origin`]          | Anyone        |
//! | `PUT /v1/admin/config`           | [`routes::admin`]           | Admin         |
//!
//! Credential calls carry the signed id alias in the body and are
//! authenticated by verifying it; participant calls carry it in the
//! `X-Id-Alias` header.
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → BodyLimit → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Auto-generated via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Request bodies are small JSON documents; 256 KiB is generous.
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` are mounted outside the API stack.
pub fn app(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::events::router())
        .merge(routes::participants::router())
        .merge(routes::credentials::router())
        .merge(routes::consent::router())
        .merge(routes::origin::router())
        .merge(routes::admin::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(prometheus_metrics))
        .layer(Extension(metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics: Prometheus metrics scrape endpoint.
///
/// Registry and issuer gauges are refreshed from `AppState` on each scrape.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    metrics.set_registry_gauges(state.registry.participant_count(), state.registry.event_count());
    metrics.set_issuer_gauges(state.issuer.is_configured(), state.key_ephemeral);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe: Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 503 until the issuer has a trust configuration.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.issuer.is_configured() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "issuer not configured")
    }
}
