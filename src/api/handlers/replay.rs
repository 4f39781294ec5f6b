//! Replay handlers: full document and sandboxed base frame.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;

use super::parse_session_id;
use crate::app_state::AppState;
use crate::error::{ErrorBody, GatewayError};

/// Header value that forbids script execution in a rendered frame.
pub const FRAME_CSP: &str = "default-src 'self' data: blob: 'unsafe-inline'; script-src 'none'";

/// `GET /sessions/{id}/replay`: Compose the replay document.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] for an unknown session and
/// [`GatewayError::StoreUnavailable`] if composition fails or times out.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/replay",
    tag = "Replay",
    summary = "Get replay document",
    description = "Returns session metadata, the sanitized base snapshot, captured styles, and the ordered event timeline.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Replay document", body = serde_json::Value),
        (status = 400, description = "Malformed session id", body = ErrorBody),
        (status = 404, description = "Session not found", body = ErrorBody),
        (status = 503, description = "Store unavailable", body = ErrorBody),
    )
)]
pub async fn get_replay(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = parse_session_id(&id)?;
    let body = state.replay.compose_json(id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

/// `GET /sessions/{id}/replay/frame`: Sandboxed base snapshot as HTML.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] for an unknown session.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/replay/frame",
    tag = "Replay",
    summary = "Get replay base frame",
    description = "Returns the sanitized base snapshot as an HTML document with scripts disabled.",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Sandboxed HTML document", content_type = "text/html"),
        (status = 404, description = "Session not found", body = ErrorBody),
    )
)]
pub async fn get_frame(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = parse_session_id(&id)?;
    let html = state.replay.render_frame(id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CONTENT_SECURITY_POLICY, FRAME_CSP),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        html,
    ))
}

/// Replay routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/{id}/replay", get(get_replay))
        .route("/sessions/{id}/replay/frame", get(get_frame))
}
