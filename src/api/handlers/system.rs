//! System endpoints: health check and event catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::EventKind;
use crate::domain::event_kind::SESSION_START_TAG;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Accepted message tag.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventTypeInfo {
    event_type: &'static str,
    description: &'static str,
    starts_session: bool,
}

/// `GET /config/event-types`: List accepted message tags.
#[utoipa::path(
    get,
    path = "/config/event-types",
    tag = "System",
    summary = "List accepted event types",
    description = "Returns every `type` tag the ingestion endpoints accept.",
    responses(
        (status = 200, description = "Event type catalog", body = Vec<EventTypeInfo>),
    )
)]
pub async fn event_types_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(event_catalog()))
}

fn event_catalog() -> Vec<EventTypeInfo> {
    let start = EventTypeInfo {
        event_type: SESSION_START_TAG,
        description: "Opens a recording session with the base DOM snapshot",
        starts_session: true,
    };
    std::iter::once(start)
        .chain(EventKind::ALL.iter().map(|kind| EventTypeInfo {
            event_type: kind.as_str(),
            description: kind.description(),
            starts_session: false,
        }))
        .collect()
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/event-types", get(event_types_handler))
}
