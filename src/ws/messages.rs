//! Server → client WebSocket replies.

use serde::Serialize;

use crate::domain::SessionId;
use crate::error::{ErrorBody, ResponseStatus};
use crate::service::IngestOutcome;

/// One reply per processed client message.
///
/// ```json
/// {"type": "session_started", "status": "success", "session_id": "…"}
/// {"type": "event_recorded", "status": "success", "event_type": "click"}
/// {"type": "error", "status": "error", "code": 1004, "message": "…", "received_data": {…}}
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A session was created and bound to this connection.
    SessionStarted {
        /// Always `success`.
        status: ResponseStatus,
        /// The new session.
        session_id: SessionId,
    },
    /// An event was stored.
    EventRecorded {
        /// Always `success`.
        status: ResponseStatus,
        /// Tag of the stored event.
        event_type: String,
    },
    /// The message was rejected; the connection stays open.
    Error {
        /// Same shape as a REST error body.
        #[serde(flatten)]
        body: ErrorBody,
    },
}

impl From<IngestOutcome> for ServerMessage {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::SessionStarted(session_id) => Self::SessionStarted {
                status: ResponseStatus::Success,
                session_id,
            },
            IngestOutcome::EventRecorded { kind, .. } => Self::EventRecorded {
                status: ResponseStatus::Success,
                event_type: kind.as_str().to_string(),
            },
        }
    }
}

impl ServerMessage {
    /// Encodes the reply as a JSON text frame payload.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to encode ws reply");
            String::from(r#"{"type":"error","status":"error","code":3000,"message":"internal error","received_data":null}"#)
        })
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::EventKind;
    use crate::error::GatewayError;

    fn encoded(message: &ServerMessage) -> Value {
        serde_json::from_str(&message.to_json()).unwrap_or(Value::Null)
    }

    #[test]
    fn session_started_shape() {
        let id = SessionId::new();
        let value = encoded(&IngestOutcome::SessionStarted(id).into());
        assert_eq!(value["type"], "session_started");
        assert_eq!(value["status"], "success");
        assert_eq!(value["session_id"], id.to_string());
    }

    #[test]
    fn event_recorded_shape() {
        let outcome = IngestOutcome::EventRecorded {
            session_id: SessionId::new(),
            kind: EventKind::Scroll,
        };
        let value = encoded(&outcome.into());
        assert_eq!(value["type"], "event_recorded");
        assert_eq!(value["event_type"], "scroll");
    }

    #[test]
    fn error_is_flattened_rest_body() {
        let err = GatewayError::UnknownEventType {
            event_type: "teleport".to_string(),
            received: json!({"type": "teleport"}),
        };
        let value = encoded(&ServerMessage::Error { body: err.to_body() });
        assert_eq!(value["type"], "error");
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], 1004);
        assert_eq!(value["received_data"]["type"], "teleport");
    }
}
