//! REST endpoint handlers organized by resource.

pub mod ingest;
pub mod replay;
pub mod session;
pub mod system;

use axum::Router;

use crate::app_state::AppState;
use crate::domain::SessionId;
use crate::error::GatewayError;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(ingest::routes())
        .merge(session::routes())
        .merge(replay::routes())
}

/// Parses a path segment as a session id.
fn parse_session_id(raw: &str) -> Result<SessionId, GatewayError> {
    raw.parse()
        .map_err(|_| GatewayError::InvalidRequest(format!("malformed session id: {raw}")))
}
