//! Telemetry event model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{EventKind, SessionId};

/// Key inside an event's `data` that carries an incremental DOM diff.
pub const HTML_DIFF_KEY: &str = "htmlDiff";

/// An accepted event about to be appended to a session's log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    /// Owning session.
    pub session_id: SessionId,
    /// Validated event kind.
    pub kind: EventKind,
    /// Server-assigned acceptance time, the ordering key.
    pub timestamp: DateTime<Utc>,
    /// Event payload exactly as received.
    pub data: Value,
    /// Incremental DOM diff copied from `data.htmlDiff`.
    pub html_diff: Option<String>,
}

impl NewEvent {
    /// Builds an event stamped with the current time, copying
    /// `data.htmlDiff` into [`NewEvent::html_diff`]. `data` is kept whole.
    #[must_use]
    pub fn accept(session_id: SessionId, kind: EventKind, data: Value) -> Self {
        let html_diff = html_diff_of(&data);
        Self {
            session_id,
            kind,
            timestamp: Utc::now(),
            data,
            html_diff,
        }
    }
}

/// A persisted event row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEvent {
    /// Store-assigned row id, increasing in insertion order.
    pub id: i64,
    /// Owning session.
    pub session_id: SessionId,
    /// Event type tag.
    pub event_type: String,
    /// Server-assigned acceptance time.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub data: Value,
    /// Incremental DOM diff, if one was sent.
    pub html_diff: Option<String>,
}

/// Reads the `htmlDiff` of an object payload without removing it.
///
/// String diffs are returned verbatim; any other non-null value as its JSON
/// text. Non-object payloads carry no diff.
#[must_use]
pub fn html_diff_of(data: &Value) -> Option<String> {
    match data.get(HTML_DIFF_KEY)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Whether any string or object key inside `value` contains a NUL character.
///
/// PostgreSQL `text` and `jsonb` columns cannot hold `\u0000`.
#[must_use]
pub fn contains_nul(value: &Value) -> bool {
    match value {
        Value::String(text) => text.contains('\0'),
        Value::Array(items) => items.iter().any(contains_nul),
        Value::Object(map) => map
            .iter()
            .any(|(key, item)| key.contains('\0') || contains_nul(item)),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}
