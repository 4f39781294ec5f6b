//! Session listing, detail, and dashboard handlers.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::parse_session_id;
use crate::api::dto::{
    PaginationMeta, PaginationParams, SessionListResponse, SessionSummaryDto, StatsResponse,
};
use crate::app_state::AppState;
use crate::error::{ErrorBody, GatewayError};

/// `GET /sessions`: List sessions, newest first.
///
/// # Errors
///
/// Returns [`GatewayError::StoreUnavailable`] if the store fails.
#[utoipa::path(
    get,
    path = "/api/v1/sessions",
    tag = "Sessions",
    summary = "List sessions",
    description = "Returns a paginated list of recorded sessions, newest first.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated session list", body = SessionListResponse),
        (status = 503, description = "Store unavailable", body = ErrorBody),
    )
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let params = params.clamped();
    let page = state.sessions.list(params.page, params.per_page).await?;

    Ok(Json(SessionListResponse {
        data: page.sessions.into_iter().map(Into::into).collect(),
        pagination: PaginationMeta::new(params.page, params.per_page, page.total),
    }))
}

/// `GET /sessions/{id}`: Session summary.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for a malformed id and
/// [`GatewayError::NotFound`] if the session does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    summary = "Get session summary",
    params(
        ("id" = uuid::Uuid, Path, description = "Session UUID"),
    ),
    responses(
        (status = 200, description = "Session summary", body = SessionSummaryDto),
        (status = 400, description = "Malformed session id", body = ErrorBody),
        (status = 404, description = "Session not found", body = ErrorBody),
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = parse_session_id(&id)?;
    let summary = state.sessions.summary(id).await?;
    Ok(Json(SessionSummaryDto::from(summary)))
}

/// `GET /stats`: Dashboard counters and recent sessions.
///
/// # Errors
///
/// Returns [`GatewayError::StoreUnavailable`] if the store fails.
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "Sessions",
    summary = "Dashboard statistics",
    description = "Returns session and event counts along with the ten most recent sessions.",
    responses(
        (status = 200, description = "Dashboard snapshot", body = StatsResponse),
        (status = 503, description = "Store unavailable", body = ErrorBody),
    )
)]
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, GatewayError> {
    let snapshot = state.sessions.dashboard().await?;
    Ok(Json(StatsResponse::from(snapshot)))
}

/// Session query routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", get(get_session))
        .route("/stats", get(stats))
}
