//! Replay document: the self-contained artifact a player consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Session, SessionId, StoredEvent};

/// Session metadata carried in a [`ReplayDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySession {
    /// Session identifier.
    pub id: SessionId,
    /// Recorded page URL.
    pub page_url: String,
    /// Recorded page title.
    pub page_title: String,
    /// Browser user agent.
    pub user_agent: String,
    /// Screen width in pixels.
    pub screen_width: i32,
    /// Screen height in pixels.
    pub screen_height: i32,
    /// Window width in pixels.
    pub window_width: i32,
    /// Window height in pixels.
    pub window_height: i32,
    /// Session start, epoch milliseconds.
    pub start_time: i64,
    /// Session end, epoch milliseconds.
    pub end_time: Option<i64>,
    /// Whether the session is still recording.
    pub is_active: bool,
    /// Number of events in the document.
    pub event_count: usize,
}

/// One event on the replay timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEvent {
    /// Event type tag.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Acceptance time, epoch milliseconds.
    pub timestamp: i64,
    /// Milliseconds since session start, never negative.
    pub offset_ms: i64,
    /// Event payload as recorded.
    pub data: Value,
    /// Incremental DOM diff.
    pub html_diff: Option<String>,
}

impl ReplayEvent {
    /// Normalizes a stored event against the session start.
    #[must_use]
    pub fn from_stored(event: StoredEvent, session_start: DateTime<Utc>) -> Self {
        let timestamp = event.timestamp.timestamp_millis();
        Self {
            event_type: event.event_type,
            timestamp,
            offset_ms: timestamp
                .saturating_sub(session_start.timestamp_millis())
                .max(0),
            data: event.data,
            html_diff: event.html_diff,
        }
    }
}

/// Composed replay of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDocument {
    /// Identifying metadata.
    pub session: ReplaySession,
    /// Sanitized base snapshot inside the replay shell.
    pub html: String,
    /// Stored stylesheet text, unchanged.
    pub styles: Option<String>,
    /// Time-ordered events.
    pub events: Vec<ReplayEvent>,
}

impl ReplayDocument {
    /// Assembles a document from a session, its sanitized snapshot and its
    /// events, which must already be in timeline order.
    #[must_use]
    pub fn assemble(session: Session, html: String, events: Vec<StoredEvent>) -> Self {
        let start = session.start_time;
        let events: Vec<ReplayEvent> = events
            .into_iter()
            .map(|event| ReplayEvent::from_stored(event, start))
            .collect();
        Self {
            session: ReplaySession {
                id: session.id,
                page_url: session.page_url,
                page_title: session.page_title,
                user_agent: session.user_agent,
                screen_width: session.screen_width,
                screen_height: session.screen_height,
                window_width: session.window_width,
                window_height: session.window_height,
                start_time: start.timestamp_millis(),
                end_time: session.end_time.map(|t| t.timestamp_millis()),
                is_active: session.is_active,
                event_count: events.len(),
            },
            html,
            styles: session.page_styles,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewSession;
    use chrono::TimeZone;
    use serde_json::json;

    fn stored(id: i64, millis: i64, session_id: SessionId) -> StoredEvent {
        StoredEvent {
            id,
            session_id,
            event_type: "click".to_string(),
            timestamp: Utc.timestamp_millis_opt(millis).single().unwrap_or_default(),
            data: json!({"x": 1}),
            html_diff: None,
        }
    }

    #[test]
    fn offsets_are_relative_and_clamped() {
        let id = SessionId::new();
        let start = Utc.timestamp_millis_opt(10_000).single().unwrap_or_default();
        let session = Session::from_new(id, start, NewSession::default());
        let doc = ReplayDocument::assemble(
            session,
            String::new(),
            vec![stored(1, 9_000, id), stored(2, 10_250, id)],
        );
        let offsets: Vec<i64> = doc.events.iter().map(|e| e.offset_ms).collect();
        assert_eq!(offsets, vec![0, 250]);
        assert_eq!(doc.events.first().map(|e| e.timestamp), Some(9_000));
        assert_eq!(doc.session.start_time, 10_000);
        assert_eq!(doc.session.event_count, 2);
    }

    #[test]
    fn wire_field_is_type() {
        let id = SessionId::new();
        let event = ReplayEvent::from_stored(stored(1, 5, id), Utc::now());
        let value = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(value.get("type"), Some(&json!("click")));
        assert!(value.get("event_type").is_none());
    }
}
