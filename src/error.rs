//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for ingestion, replay, and
//! listing. Each variant maps to a numeric code and an HTTP status. The
//! same [`ErrorBody`] shape is sent as a REST response body and as a
//! WebSocket error message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::SessionId;
use crate::store::StoreError;

/// Outcome marker carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The message was accepted.
    Success,
    /// The message was rejected.
    Error,
}

/// Structured JSON error payload.
///
/// ```json
/// {
///   "status": "error",
///   "code": 1004,
///   "message": "unknown event type: teleport",
///   "received_data": {"type": "teleport"}
/// }
/// ```
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Always [`ResponseStatus::Error`].
    pub status: ResponseStatus,
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// The rejected payload echoed back for diagnostics.
    pub received_data: Option<Value>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request / 413        |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 / 503                    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The body could not be parsed as a JSON object.
    #[error("malformed payload: {reason}")]
    MalformedPayload {
        /// Parser message.
        reason: String,
        /// The raw body as received.
        raw: String,
    },

    /// The payload parsed but a field has the wrong shape.
    #[error("invalid payload: {reason}")]
    Validation {
        /// What was wrong.
        reason: String,
        /// The parsed payload.
        received: Value,
    },

    /// An event arrived without a session to attach it to.
    #[error("missing session reference: send session_start first or include session_id")]
    MissingSessionReference {
        /// The parsed payload.
        received: Value,
    },

    /// The `type` tag is not in the event catalog.
    #[error("unknown event type: {event_type}")]
    UnknownEventType {
        /// The offending tag.
        event_type: String,
        /// The parsed payload.
        received: Value,
    },

    /// The referenced session does not exist.
    #[error("unknown session: {session_id}")]
    UnknownSession {
        /// The session reference as sent.
        session_id: String,
        /// The parsed payload.
        received: Value,
    },

    /// Replay or lookup of a session that does not exist.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// Write to a session that has already ended.
    #[error("session {session_id} has ended and no longer accepts events")]
    SessionClosed {
        /// The ended session.
        session_id: SessionId,
        /// The parsed payload, when the write came from a client message.
        received: Option<Value>,
    },

    /// A second `session_start` on a connection that already has one.
    #[error("session {0} is already recording on this connection")]
    SessionAlreadyStarted(SessionId),

    /// The message exceeds the configured size limit. Nothing was read
    /// beyond the limit, so there is no payload to echo.
    #[error("payload exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// Request validation failed outside the ingestion path.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The store could not complete the operation. Nothing was written.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MalformedPayload { .. } => 1001,
            Self::Validation { .. } => 1002,
            Self::MissingSessionReference { .. } => 1003,
            Self::UnknownEventType { .. } => 1004,
            Self::InvalidRequest(_) => 1005,
            Self::PayloadTooLarge { .. } => 1006,
            Self::UnknownSession { .. } => 2001,
            Self::NotFound(_) => 2002,
            Self::SessionClosed { .. } => 2003,
            Self::SessionAlreadyStarted(_) => 2004,
            Self::Internal(_) => 3000,
            Self::StoreUnavailable(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedPayload { .. }
            | Self::Validation { .. }
            | Self::MissingSessionReference { .. }
            | Self::UnknownEventType { .. }
            | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnknownSession { .. } | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::SessionClosed { .. } | Self::SessionAlreadyStarted(_) => StatusCode::CONFLICT,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `true` for infrastructure failures a client may retry unchanged.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Internal(_))
    }

    /// The payload to echo back, if the error was caused by one.
    #[must_use]
    pub fn received_data(&self) -> Option<Value> {
        match self {
            Self::MalformedPayload { raw, .. } => Some(Value::String(raw.clone())),
            Self::Validation { received, .. }
            | Self::MissingSessionReference { received }
            | Self::UnknownEventType { received, .. }
            | Self::UnknownSession { received, .. } => Some(received.clone()),
            Self::SessionClosed { received, .. } => received.clone(),
            _ => None,
        }
    }

    /// Builds the wire error body.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status: ResponseStatus::Error,
            code: self.error_code(),
            message: self.to_string(),
            received_data: self.received_data(),
        }
    }

    /// Logs the error at a level matching its category.
    pub fn log(&self, surface: &'static str) {
        if self.is_server_error() {
            tracing::error!(surface, code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::warn!(surface, code = self.error_code(), error = %self, "message rejected");
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound(id) => Self::NotFound(id),
            StoreError::SessionClosed(id) => Self::SessionClosed {
                session_id: id,
                received: None,
            },
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.log("http");
        let status = self.status_code();
        let mut response = axum::Json(self.to_body()).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_errors_map_to_4xx() {
        let err = GatewayError::UnknownEventType {
            event_type: "teleport".to_string(),
            received: json!({"type": "teleport"}),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());

        let err = GatewayError::UnknownSession {
            session_id: "abc".to_string(),
            received: json!({}),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_failures_are_retryable_server_errors() {
        let err = GatewayError::from(StoreError::Unavailable("pool timed out".to_string()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_server_error());
        assert_eq!(err.error_code(), 3001);
    }

    #[test]
    fn body_echoes_received_payload() {
        let received = json!({"type": "teleport", "data": {"x": 1}});
        let err = GatewayError::UnknownEventType {
            event_type: "teleport".to_string(),
            received: received.clone(),
        };
        let body = serde_json::to_value(err.to_body()).unwrap_or_default();
        assert_eq!(body.get("status"), Some(&json!("error")));
        assert_eq!(body.get("code"), Some(&json!(1004)));
        assert_eq!(body.get("message"), Some(&json!("unknown event type: teleport")));
        assert_eq!(body.get("received_data"), Some(&received));
    }

    #[test]
    fn malformed_body_echoes_raw_text() {
        let err = GatewayError::MalformedPayload {
            reason: "expected value".to_string(),
            raw: "{not json".to_string(),
        };
        assert_eq!(err.received_data(), Some(json!("{not json")));
    }

    #[test]
    fn oversize_payload_is_413_without_echo() {
        let err = GatewayError::PayloadTooLarge { limit: 64 };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.error_code(), 1006);
        assert!(!err.is_server_error());
        assert!(err.received_data().is_none());
        assert_eq!(err.to_string(), "payload exceeds the 64 byte limit");
    }

    #[test]
    fn not_found_has_no_echo() {
        let err = GatewayError::NotFound(SessionId::new());
        assert!(err.received_data().is_none());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
