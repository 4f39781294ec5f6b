//! Ingestion service: classifies, validates, and persists telemetry
//! messages from either ingestion surface.
//!
//! Both surfaces go through [`IngestService::ingest`]. They differ only in
//! how an event finds its session, which [`SessionContext`] encodes: the
//! request surface reads `session_id` from each message, the connection
//! surface uses the session it started.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{
    EventKind, MessageKind, NewEvent, SessionId, SessionStartPayload, contains_nul,
};
use crate::error::GatewayError;
use crate::store::{StoreError, TelemetryStore};

/// Ingestion surface a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Stateless request-per-message.
    Request,
    /// Long-lived bidirectional channel.
    Connection,
}

impl Surface {
    /// Label used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "http",
            Self::Connection => "ws",
        }
    }
}

/// Session state carried through the handler for one message
/// ([`Surface::Request`]) or one connection ([`Surface::Connection`]).
#[derive(Debug)]
pub struct SessionContext {
    surface: Surface,
    current: Option<SessionId>,
}

impl SessionContext {
    /// Context for a single stateless request.
    #[must_use]
    pub const fn request() -> Self {
        Self {
            surface: Surface::Request,
            current: None,
        }
    }

    /// Context for a new persistent connection.
    #[must_use]
    pub const fn connection() -> Self {
        Self {
            surface: Surface::Connection,
            current: None,
        }
    }

    /// The surface this context belongs to.
    #[must_use]
    pub const fn surface(&self) -> Surface {
        self.surface
    }

    /// The session started on this connection, if any.
    #[must_use]
    pub const fn current(&self) -> Option<SessionId> {
        self.current
    }
}

/// What an accepted message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new session was created.
    SessionStarted(SessionId),
    /// An event was appended to a session.
    EventRecorded {
        /// Owning session.
        session_id: SessionId,
        /// Kind of the recorded event.
        kind: EventKind,
    },
}

/// Parses a raw message body into a JSON object.
///
/// # Errors
///
/// Returns [`GatewayError::MalformedPayload`] if the text is not JSON or
/// not a JSON object.
pub fn parse_message(raw: &str) -> Result<Value, GatewayError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(GatewayError::MalformedPayload {
            reason: "expected a JSON object".to_string(),
            raw: raw.to_string(),
        }),
        Err(e) => Err(GatewayError::MalformedPayload {
            reason: e.to_string(),
            raw: raw.to_string(),
        }),
    }
}

/// Orchestrates ingestion against a [`TelemetryStore`].
///
/// Every rejection happens before the store is touched; every accepted
/// message is exactly one store write.
#[derive(Debug, Clone)]
pub struct IngestService {
    store: Arc<dyn TelemetryStore>,
}

impl IngestService {
    /// Creates a new `IngestService`.
    #[must_use]
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TelemetryStore> {
        &self.store
    }

    /// Parses and ingests a raw message body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedPayload`] for unparseable text, and
    /// otherwise whatever [`IngestService::ingest`] returns.
    pub async fn ingest_text(
        &self,
        raw: &str,
        ctx: &mut SessionContext,
    ) -> Result<IngestOutcome, GatewayError> {
        let message = parse_message(raw)?;
        self.ingest(message, ctx).await
    }

    /// Classifies one message by its `type` tag and handles it.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UnknownEventType`] for a missing or unrecognized tag.
    /// - [`GatewayError::Validation`] for ill-typed fields or NUL characters.
    /// - [`GatewayError::MissingSessionReference`] when an event has no session.
    /// - [`GatewayError::UnknownSession`] when the session does not exist.
    /// - [`GatewayError::SessionClosed`] when the session has ended.
    /// - [`GatewayError::SessionAlreadyStarted`] for a repeated start on a connection.
    /// - [`GatewayError::StoreUnavailable`] when the store fails.
    pub async fn ingest(
        &self,
        message: Value,
        ctx: &mut SessionContext,
    ) -> Result<IngestOutcome, GatewayError> {
        let Some(tag) = message.get("type").and_then(Value::as_str) else {
            return Err(GatewayError::UnknownEventType {
                event_type: "(missing)".to_string(),
                received: message,
            });
        };

        let kind = match MessageKind::classify(tag) {
            MessageKind::SessionStart => None,
            MessageKind::Event(kind) => Some(kind),
            MessageKind::Unknown(tag) => {
                return Err(GatewayError::UnknownEventType {
                    event_type: tag.to_string(),
                    received: message.clone(),
                });
            }
        };

        // Text columns cannot store NUL; retrying would never succeed.
        if contains_nul(&message) {
            return Err(GatewayError::Validation {
                reason: "text must not contain NUL characters".to_string(),
                received: message,
            });
        }

        match kind {
            None => self.start_session(message, ctx).await,
            Some(kind) => self.record_event(kind, message, ctx).await,
        }
    }

    async fn start_session(
        &self,
        message: Value,
        ctx: &mut SessionContext,
    ) -> Result<IngestOutcome, GatewayError> {
        if ctx.surface == Surface::Connection
            && let Some(current) = ctx.current
        {
            return Err(GatewayError::SessionAlreadyStarted(current));
        }

        let payload = match SessionStartPayload::deserialize(&message) {
            Ok(payload) => payload,
            Err(e) => {
                return Err(GatewayError::Validation {
                    reason: e.to_string(),
                    received: message,
                });
            }
        };

        let session = self.store.create_session(payload.into()).await?;
        if ctx.surface == Surface::Connection {
            ctx.current = Some(session.id);
        }

        tracing::info!(
            session_id = %session.id,
            surface = ctx.surface.as_str(),
            page_url = %session.page_url,
            "session started"
        );
        Ok(IngestOutcome::SessionStarted(session.id))
    }

    async fn record_event(
        &self,
        kind: EventKind,
        message: Value,
        ctx: &SessionContext,
    ) -> Result<IngestOutcome, GatewayError> {
        let session_id = resolve_session(&message, ctx)?;

        let data = match message.get("data") {
            None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
            Some(data) => data.clone(),
        };
        if let Err(reason) = kind.validate(&data) {
            return Err(GatewayError::Validation {
                reason,
                received: message,
            });
        }

        match self
            .store
            .append_event(NewEvent::accept(session_id, kind, data))
            .await
        {
            Ok(stored) => {
                tracing::debug!(
                    %session_id,
                    event_type = %kind,
                    event_id = stored.id,
                    has_diff = stored.html_diff.is_some(),
                    "event recorded"
                );
                Ok(IngestOutcome::EventRecorded { session_id, kind })
            }
            Err(StoreError::SessionNotFound(id)) => Err(GatewayError::UnknownSession {
                session_id: id.to_string(),
                received: message,
            }),
            Err(StoreError::SessionClosed(id)) => Err(GatewayError::SessionClosed {
                session_id: id,
                received: Some(message),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Closes the session started on a connection, at most once.
    ///
    /// Returns the closed session id, or `None` if the context never
    /// started one (or it was already closed through this context).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the session was deleted in the
    /// meantime, or [`GatewayError::StoreUnavailable`] on store failure.
    pub async fn end_session(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<Option<SessionId>, GatewayError> {
        let Some(id) = ctx.current.take() else {
            return Ok(None);
        };
        if self.store.close_session(id, Utc::now()).await? {
            tracing::info!(session_id = %id, "session closed");
        } else {
            tracing::debug!(session_id = %id, "session was already closed");
        }
        Ok(Some(id))
    }
}

/// Finds the session an event belongs to.
fn resolve_session(message: &Value, ctx: &SessionContext) -> Result<SessionId, GatewayError> {
    let missing = || GatewayError::MissingSessionReference {
        received: message.clone(),
    };

    if ctx.surface == Surface::Connection {
        return ctx.current.ok_or_else(missing);
    }

    let reference = match message.get("session_id") {
        None | Some(Value::Null) => return Err(missing()),
        Some(Value::String(s)) if s.trim().is_empty() => return Err(missing()),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    reference
        .parse::<SessionId>()
        .map_err(|_| GatewayError::UnknownSession {
            session_id: reference.clone(),
            received: message.clone(),
        })
}
