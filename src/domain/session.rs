//! Recording session model.
//!
//! A [`Session`] holds the base DOM snapshot and viewport metadata that a
//! replay starts from. [`SessionStartPayload`] is the inbound
//! `session_start` message; every field is optional and has a default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionId;

/// A stored recording session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Server-generated identifier.
    pub id: SessionId,
    /// When the session was created.
    pub start_time: DateTime<Utc>,
    /// When the session was closed; `None` while active.
    pub end_time: Option<DateTime<Utc>>,
    /// URL of the recorded page.
    pub page_url: String,
    /// Title of the recorded page.
    pub page_title: String,
    /// Browser user agent string.
    pub user_agent: String,
    /// Screen width in pixels.
    pub screen_width: i32,
    /// Screen height in pixels.
    pub screen_height: i32,
    /// Browser window inner width in pixels.
    pub window_width: i32,
    /// Browser window inner height in pixels.
    pub window_height: i32,
    /// `true` until the ingestion channel that started it ends.
    pub is_active: bool,
    /// Base DOM snapshot.
    pub page_html: Option<String>,
    /// Captured stylesheet text.
    pub page_styles: Option<String>,
}

impl Session {
    /// Builds an active session from creation parameters.
    #[must_use]
    pub fn from_new(id: SessionId, start_time: DateTime<Utc>, new: NewSession) -> Self {
        Self {
            id,
            start_time,
            end_time: None,
            page_url: new.page_url,
            page_title: new.page_title,
            user_agent: new.user_agent,
            screen_width: new.screen_width,
            screen_height: new.screen_height,
            window_width: new.window_width,
            window_height: new.window_height,
            is_active: true,
            page_html: new.page_html,
            page_styles: new.page_styles,
        }
    }

    /// Wall-clock duration of a closed session.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Creation parameters for a session; the store assigns id and start time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSession {
    /// URL of the recorded page.
    pub page_url: String,
    /// Title of the recorded page.
    pub page_title: String,
    /// Browser user agent string.
    pub user_agent: String,
    /// Screen width in pixels.
    pub screen_width: i32,
    /// Screen height in pixels.
    pub screen_height: i32,
    /// Window inner width in pixels.
    pub window_width: i32,
    /// Window inner height in pixels.
    pub window_height: i32,
    /// Base DOM snapshot.
    pub page_html: Option<String>,
    /// Captured stylesheet text.
    pub page_styles: Option<String>,
}

/// Width/height pair as sent by the browser client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    #[serde(default)]
    pub width: Option<i32>,
    /// Height in pixels.
    #[serde(default)]
    pub height: Option<i32>,
}

/// Inbound `session_start` message body.
///
/// Unknown fields (the client also sends `events` and `startTime`) are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartPayload {
    /// Page URL.
    #[serde(default)]
    pub page_url: Option<String>,
    /// Page title.
    #[serde(default)]
    pub page_title: Option<String>,
    /// User agent.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// `window.screen` dimensions.
    #[serde(default)]
    pub screen_resolution: Option<Dimensions>,
    /// `window.inner*` dimensions.
    #[serde(default)]
    pub window_size: Option<Dimensions>,
    /// Serialized DOM snapshot.
    #[serde(default)]
    pub page_html: Option<String>,
    /// Captured stylesheet text.
    #[serde(default)]
    pub page_styles: Option<String>,
}

impl From<SessionStartPayload> for NewSession {
    fn from(payload: SessionStartPayload) -> Self {
        let screen = payload.screen_resolution.unwrap_or_default();
        let window = payload.window_size.unwrap_or_default();
        Self {
            page_url: payload.page_url.unwrap_or_default(),
            page_title: payload.page_title.unwrap_or_default(),
            user_agent: payload.user_agent.unwrap_or_default(),
            screen_width: screen.width.unwrap_or(0),
            screen_height: screen.height.unwrap_or(0),
            window_width: window.width.unwrap_or(0),
            window_height: window.height.unwrap_or(0),
            page_html: payload.page_html,
            page_styles: payload.page_styles,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> NewSession {
        let Ok(payload) = serde_json::from_value::<SessionStartPayload>(value) else {
            panic!("payload should parse");
        };
        NewSession::from(payload)
    }

    #[test]
    fn empty_payload_uses_defaults() {
        let new = parse(json!({"type": "session_start"}));
        assert_eq!(new, NewSession::default());
    }

    #[test]
    fn nulls_are_treated_as_missing() {
        let new = parse(json!({
            "pageUrl": null,
            "windowSize": null,
            "screenResolution": {"width": null}
        }));
        assert_eq!(new.page_url, "");
        assert_eq!(new.window_width, 0);
        assert_eq!(new.screen_width, 0);
    }

    #[test]
    fn full_payload_maps_every_field() {
        let new = parse(json!({
            "type": "session_start",
            "pageUrl": "https://x.test",
            "pageTitle": "Home",
            "userAgent": "UA/1.0",
            "screenResolution": {"width": 1920, "height": 1080},
            "windowSize": {"width": 800, "height": 600},
            "pageHtml": "<html><body>hi</body></html>",
            "pageStyles": "body{}",
            "events": [],
            "startTime": 1_700_000_000_000_i64
        }));
        assert_eq!(new.page_url, "https://x.test");
        assert_eq!(new.page_title, "Home");
        assert_eq!(new.user_agent, "UA/1.0");
        assert_eq!((new.screen_width, new.screen_height), (1920, 1080));
        assert_eq!((new.window_width, new.window_height), (800, 600));
        assert_eq!(new.page_html.as_deref(), Some("<html><body>hi</body></html>"));
        assert_eq!(new.page_styles.as_deref(), Some("body{}"));
    }

    #[test]
    fn ill_typed_dimension_is_rejected() {
        let result =
            serde_json::from_value::<SessionStartPayload>(json!({"windowSize": {"width": "wide"}}));
        assert!(result.is_err());
    }

    #[test]
    fn duration_only_for_closed_sessions() {
        let start = Utc::now();
        let mut session = Session::from_new(SessionId::new(), start, NewSession::default());
        assert!(session.is_active);
        assert!(session.duration().is_none());

        session.end_time = Some(start + chrono::Duration::seconds(5));
        session.is_active = false;
        assert_eq!(session.duration(), Some(chrono::Duration::seconds(5)));
    }
}
