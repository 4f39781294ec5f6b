//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// Smallest transport read cap, matching tungstenite's default message size.
const MIN_READ_CEILING: usize = 64 << 20;

/// Transport read cap for a payload limit.
///
/// The payload limit itself is enforced per message by the connection loop,
/// so the transport must accept somewhat more than it.
fn read_ceiling(max_payload_bytes: usize) -> usize {
    max_payload_bytes.saturating_mul(4).max(MIN_READ_CEILING)
}

/// `GET /ws`: Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let ingest = Arc::clone(&state.ingest);
    let limit = state.max_payload_bytes;
    let ceiling = read_ceiling(limit);

    ws.max_message_size(ceiling)
        .max_frame_size(ceiling)
        .on_upgrade(move |socket| run_connection(socket, ingest, limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_stays_above_payload_limit() {
        assert_eq!(read_ceiling(256), MIN_READ_CEILING);
        assert_eq!(read_ceiling(32 << 20), 128 << 20);
        assert_eq!(read_ceiling(usize::MAX), usize::MAX);
    }
}
