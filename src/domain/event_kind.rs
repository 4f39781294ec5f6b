//! Closed catalog of recognized telemetry event kinds.
//!
//! Every inbound message carries a `type` tag. [`MessageKind::classify`]
//! maps the tag to either a session start, one of the [`EventKind`]
//! variants, or an explicit unknown branch. Each [`EventKind`] owns the
//! validation rule for its `data` payload.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Tag that opens a new recording session.
pub const SESSION_START_TAG: &str = "session_start";

/// Result of classifying a message `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind<'a> {
    /// `session_start`: creates a new session.
    SessionStart,
    /// A recognized event kind that must reference an existing session.
    Event(EventKind),
    /// A tag outside the catalog. Carries the offending tag.
    Unknown(&'a str),
}

impl<'a> MessageKind<'a> {
    /// Classifies a raw `type` tag.
    #[must_use]
    pub fn classify(tag: &'a str) -> Self {
        if tag == SESSION_START_TAG {
            return Self::SessionStart;
        }
        EventKind::from_tag(tag).map_or(Self::Unknown(tag), Self::Event)
    }
}

/// A recognized interaction or DOM-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Mouse click at a viewport position.
    Click,
    /// Pointer movement.
    Mousemove,
    /// Key press (the key itself is never recorded).
    Keypress,
    /// Document scroll.
    Scroll,
    /// Viewport resize as reported by the page.
    Resize,
    /// Form field input.
    Input,
    /// `fetch()` network request.
    Fetch,
    /// `XMLHttpRequest` network request.
    Xhr,
    /// Form submission.
    FormSubmit,
    /// DOM mutation batch.
    DomMutation,
    /// Page visibility change.
    VisibilityChange,
    /// Page visibility change, short tag emitted by the bundled client.
    Visibility,
    /// Browser window resize.
    WindowResize,
    /// Script error captured on the page.
    Error,
}

// Fields that must be numeric when present, per kind family.
const POINTER_FIELDS: &[&str] = &["x", "y"];
const SCROLL_FIELDS: &[&str] = &["x", "y", "scrollX", "scrollY"];
const SIZE_FIELDS: &[&str] = &["width", "height"];

impl EventKind {
    /// Every recognized kind, in catalog order.
    pub const ALL: &'static [Self] = &[
        Self::Click,
        Self::Mousemove,
        Self::Keypress,
        Self::Scroll,
        Self::Resize,
        Self::Input,
        Self::Fetch,
        Self::Xhr,
        Self::FormSubmit,
        Self::DomMutation,
        Self::VisibilityChange,
        Self::Visibility,
        Self::WindowResize,
        Self::Error,
    ];

    /// Looks up a kind by its wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == tag)
    }

    /// Returns the wire tag for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Mousemove => "mousemove",
            Self::Keypress => "keypress",
            Self::Scroll => "scroll",
            Self::Resize => "resize",
            Self::Input => "input",
            Self::Fetch => "fetch",
            Self::Xhr => "xhr",
            Self::FormSubmit => "form_submit",
            Self::DomMutation => "dom_mutation",
            Self::VisibilityChange => "visibility_change",
            Self::Visibility => "visibility",
            Self::WindowResize => "window_resize",
            Self::Error => "error",
        }
    }

    /// Short human-readable description used by the catalog endpoint.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Click => "Mouse click with viewport coordinates",
            Self::Mousemove => "Pointer movement (throttled by the client)",
            Self::Keypress => "Key press; the key value is not recorded",
            Self::Scroll => "Document scroll offset",
            Self::Resize | Self::WindowResize => "Viewport dimensions changed",
            Self::Input => "Form field value changed",
            Self::Fetch => "fetch() request observed",
            Self::Xhr => "XMLHttpRequest observed",
            Self::FormSubmit => "Form submitted",
            Self::DomMutation => "DOM mutation batch, usually with an htmlDiff",
            Self::VisibilityChange | Self::Visibility => "Page visibility changed",
            Self::Error => "Script error raised on the page",
        }
    }

    /// Numeric fields checked by [`EventKind::validate`].
    const fn numeric_fields(self) -> &'static [&'static str] {
        match self {
            Self::Click | Self::Mousemove => POINTER_FIELDS,
            Self::Scroll => SCROLL_FIELDS,
            Self::Resize | Self::WindowResize => SIZE_FIELDS,
            _ => &[],
        }
    }

    /// Checks an event payload against this kind's shape.
    ///
    /// The payload must be a JSON object. Positional and size fields, when
    /// present and non-null, must be numbers.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the payload is rejected.
    pub fn validate(self, data: &Value) -> Result<(), String> {
        let Some(object) = data.as_object() else {
            return Err(format!("`data` for `{self}` must be an object"));
        };
        for field in self.numeric_fields() {
            match object.get(*field) {
                None | Some(Value::Null) | Some(Value::Number(_)) => {}
                Some(_) => {
                    return Err(format!("`data.{field}` for `{self}` must be a number"));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_tag_round_trips_through_lookup() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_tag(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn classify_session_start() {
        assert_eq!(MessageKind::classify("session_start"), MessageKind::SessionStart);
    }

    #[test]
    fn classify_known_event() {
        assert_eq!(
            MessageKind::classify("dom_mutation"),
            MessageKind::Event(EventKind::DomMutation)
        );
    }

    #[test]
    fn classify_unknown_keeps_tag() {
        assert_eq!(MessageKind::classify("teleport"), MessageKind::Unknown("teleport"));
        assert_eq!(MessageKind::classify("Click"), MessageKind::Unknown("Click"));
    }

    #[test]
    fn serde_uses_wire_tag() {
        let json = serde_json::to_string(&EventKind::FormSubmit).ok();
        assert_eq!(json.as_deref(), Some("\"form_submit\""));
    }

    #[test]
    fn click_accepts_numeric_coordinates() {
        assert!(EventKind::Click.validate(&json!({"x": 10, "y": 20.5, "target": "A"})).is_ok());
        assert!(EventKind::Click.validate(&json!({})).is_ok());
    }

    #[test]
    fn click_rejects_string_coordinates() {
        let err = EventKind::Click.validate(&json!({"x": "10", "y": 20}));
        assert!(err.is_err_and(|e| e.contains("data.x")));
    }

    #[test]
    fn scroll_checks_scroll_offsets() {
        assert!(EventKind::Scroll.validate(&json!({"scrollY": [1]})).is_err());
        assert!(EventKind::Scroll.validate(&json!({"scrollY": null})).is_ok());
    }

    #[test]
    fn non_object_payload_rejected() {
        assert!(EventKind::Keypress.validate(&json!([1, 2])).is_err());
        assert!(EventKind::Keypress.validate(&json!("x")).is_err());
    }

    #[test]
    fn unchecked_kinds_accept_any_object() {
        assert!(EventKind::Fetch.validate(&json!({"x": "anything"})).is_ok());
    }
}
