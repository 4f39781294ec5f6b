//! WebSocket connection loop.
//!
//! Messages on one connection are handled strictly in arrival order, one
//! at a time. A rejected message produces an error reply and never ends
//! the connection, including one over the payload size limit. When the
//! connection ends for any reason, the session it started is closed
//! exactly once.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::messages::ServerMessage;
use crate::error::GatewayError;
use crate::service::{IngestService, SessionContext};

/// Runs the read/reply loop for a single WebSocket connection.
///
/// Messages longer than `max_payload_bytes` are answered with a
/// [`GatewayError::PayloadTooLarge`] reply and the loop continues.
pub async fn run_connection(
    socket: WebSocket,
    ingest: Arc<IngestService>,
    max_payload_bytes: usize,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut ctx = SessionContext::connection();
    tracing::debug!("ws connection opened");

    while let Some(frame) = ws_rx.next().await {
        let reply = match frame {
            Ok(Message::Text(text)) => match check_size(text.as_str().len(), max_payload_bytes) {
                Ok(()) => handle_text_message(&ingest, text.as_str(), &mut ctx).await,
                Err(err) => reject(err),
            },
            Ok(Message::Binary(bytes)) => match check_size(bytes.len(), max_payload_bytes) {
                Ok(()) => match std::str::from_utf8(&bytes) {
                    Ok(text) => handle_text_message(&ingest, text, &mut ctx).await,
                    Err(e) => reject(GatewayError::MalformedPayload {
                        reason: e.to_string(),
                        raw: String::from_utf8_lossy(&bytes).into_owned(),
                    }),
                },
                Err(err) => reject(err),
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "ws read failed");
                break;
            }
        };
        if ws_tx.send(Message::text(reply)).await.is_err() {
            break;
        }
    }

    match ingest.end_session(&mut ctx).await {
        Ok(Some(session_id)) => tracing::debug!(%session_id, "ws connection closed"),
        Ok(None) => tracing::debug!("ws connection closed without a session"),
        Err(err) => err.log("ws"),
    }
}

/// Rejects a message of `len` bytes when it exceeds `limit`.
fn check_size(len: usize, limit: usize) -> Result<(), GatewayError> {
    if len > limit {
        Err(GatewayError::PayloadTooLarge { limit })
    } else {
        Ok(())
    }
}

/// Handles one text message, returning the JSON reply.
async fn handle_text_message(
    ingest: &IngestService,
    text: &str,
    ctx: &mut SessionContext,
) -> String {
    match ingest.ingest_text(text, ctx).await {
        Ok(outcome) => ServerMessage::from(outcome).to_json(),
        Err(err) => reject(err),
    }
}

fn reject(err: GatewayError) -> String {
    err.log("ws");
    ServerMessage::Error {
        body: err.to_body(),
    }
    .to_json()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use serde_json::{Value, json};
    use tokio_test::assert_ok;

    use super::*;
    use crate::store::{MemoryStore, TelemetryStore};

    fn service() -> (IngestService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn TelemetryStore> = Arc::clone(&store) as Arc<dyn TelemetryStore>;
        (IngestService::new(dyn_store), store)
    }

    async fn reply(ingest: &IngestService, text: &str, ctx: &mut SessionContext) -> Value {
        let raw = handle_text_message(ingest, text, ctx).await;
        serde_json::from_str(&raw).unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn stateful_stream_binds_events_to_started_session() {
        let (ingest, store) = service();
        let mut ctx = SessionContext::connection();

        let start = r#"{"type":"session_start","pageUrl":"https://x.test"}"#;
        let started = reply(&ingest, start, &mut ctx).await;
        assert_eq!(started["type"], "session_started");
        let Some(id) = ctx.current() else {
            panic!("session not bound to connection");
        };
        assert_eq!(started["session_id"], id.to_string());

        let click = json!({"type": "click", "data": {"x": 3, "y": 4}}).to_string();
        let recorded = reply(&ingest, &click, &mut ctx).await;
        assert_eq!(recorded["type"], "event_recorded");
        assert_eq!(recorded["event_type"], "click");

        let events = assert_ok!(store.list_events(id).await);
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn bad_message_gets_error_and_stream_continues() {
        let (ingest, store) = service();
        let mut ctx = SessionContext::connection();
        reply(&ingest, r#"{"type":"session_start"}"#, &mut ctx).await;

        let rejected = reply(&ingest, "not json", &mut ctx).await;
        assert_eq!(rejected["type"], "error");
        assert_eq!(rejected["code"], 1001);

        let bad_scroll = r#"{"type":"scroll","data":{"scrollY":"far"}}"#;
        let rejected = reply(&ingest, bad_scroll, &mut ctx).await;
        assert_eq!(rejected["code"], 1002);

        let scroll = r#"{"type":"scroll","data":{"scrollY":120}}"#;
        let recorded = reply(&ingest, scroll, &mut ctx).await;
        assert_eq!(recorded["type"], "event_recorded");

        let Some(id) = ctx.current() else {
            panic!("session not bound to connection");
        };
        assert_eq!(assert_ok!(store.list_events(id).await).len(), 1);
    }

    #[test]
    fn size_check_allows_exact_limit() {
        assert!(check_size(256, 256).is_ok());
        assert!(matches!(
            check_size(257, 256),
            Err(GatewayError::PayloadTooLarge { limit: 256 })
        ));
    }

    #[test]
    fn oversize_reply_is_structured_error() {
        let Err(err) = check_size(1024, 256) else {
            panic!("oversize message accepted");
        };
        let Ok(body) = serde_json::from_str::<Value>(&reject(err)) else {
            panic!("reply is not JSON");
        };
        assert_eq!(body["type"], "error");
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], 1006);
    }

    #[tokio::test]
    async fn event_before_start_is_missing_reference() {
        let (ingest, _) = service();
        let mut ctx = SessionContext::connection();
        let rejected = reply(&ingest, r#"{"type":"click","data":{"x":1,"y":1}}"#, &mut ctx).await;
        assert_eq!(rejected["code"], 1003);
        assert_eq!(rejected["received_data"]["type"], "click");
    }

    #[tokio::test]
    async fn ending_the_connection_closes_its_session() {
        let (ingest, store) = service();
        let mut ctx = SessionContext::connection();
        reply(&ingest, r#"{"type":"session_start"}"#, &mut ctx).await;
        let Some(id) = ctx.current() else {
            panic!("session not bound to connection");
        };

        let ended = assert_ok!(ingest.end_session(&mut ctx).await);
        assert_eq!(ended, Some(id));
        let Ok(Some(session)) = store.get_session(id).await else {
            panic!("session vanished");
        };
        assert!(!session.is_active);
        assert!(session.end_time.is_some());
    }
}
