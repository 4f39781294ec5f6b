//! Telemetry ingestion over plain HTTP.

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::IngestResponse;
use crate::app_state::AppState;
use crate::error::{ErrorBody, GatewayError};
use crate::service::SessionContext;

/// `POST /events`: Ingest one telemetry message.
///
/// Each request is its own context: events must carry `session_id` and
/// a session started here is never closed by the request ending.
///
/// # Errors
///
/// Returns [`GatewayError`] for malformed, invalid, or misrouted messages,
/// and [`GatewayError::PayloadTooLarge`] for a body over the size limit.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Ingestion",
    summary = "Ingest a telemetry message",
    description = "Accepts a `session_start` message or a typed event. Events must reference an existing session via `session_id`.",
    request_body(content = serde_json::Value, content_type = "application/json"),
    responses(
        (status = 200, description = "Message accepted", body = IngestResponse),
        (status = 400, description = "Malformed or invalid message", body = ErrorBody),
        (status = 404, description = "Referenced session does not exist", body = ErrorBody),
        (status = 409, description = "Referenced session has ended", body = ErrorBody),
        (status = 413, description = "Body exceeds the size limit", body = ErrorBody),
        (status = 503, description = "Store unavailable", body = ErrorBody),
    )
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge {
                limit: state.max_payload_bytes,
            }
        } else {
            GatewayError::MalformedPayload {
                reason: rejection.body_text(),
                raw: String::new(),
            }
        }
    })?;
    let raw = std::str::from_utf8(&body).map_err(|e| GatewayError::MalformedPayload {
        reason: e.to_string(),
        raw: String::from_utf8_lossy(&body).into_owned(),
    })?;
    let mut ctx = SessionContext::request();
    let outcome = state.ingest.ingest_text(raw, &mut ctx).await?;
    Ok(Json(IngestResponse::from(outcome)))
}

/// Ingestion routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events", post(ingest_event))
}
