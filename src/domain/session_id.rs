//! Recording session identifier.
//!
//! A [`SessionId`] is minted server-side when a `session_start` is
//! accepted and is the only handle a client has on its recording. On the
//! wire it is the lowercase hyphenated UUID text returned in
//! `session_started` replies, and clients echo that text back in the
//! `session_id` field of every stateless event.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a recording session.
///
/// Generated once by the store when a `session_start` is accepted and
/// immutable thereafter. Clients echo it back on the stateless surface;
/// the stateful surface keeps it in the connection's context.
///
/// Ids are random v4 UUIDs, so they reveal nothing about start order or
/// how many sessions exist. The PostgreSQL store regenerates an id on the
/// rare primary-key collision rather than failing the `session_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Mints a fresh random id for a session about to be created.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Wraps a UUID read back from storage.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a client-supplied session reference.
///
/// Surrounding whitespace is trimmed, so a reference padded with spaces or
/// a trailing newline resolves to the same session. Any form the `uuid`
/// crate accepts is allowed, including uppercase and braced text.
/// The empty string is an error; callers that treat a blank reference as
/// missing must check for it before parsing.
impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<uuid::Uuid> for SessionId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<SessionId> for uuid::Uuid {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_uuid_format() {
        let id = SessionId::new();
        let s = format!("{id}");
        assert_eq!(s.len(), 36);
        assert!(s.contains('-'));
    }

    #[test]
    fn parses_with_surrounding_whitespace() {
        let id = SessionId::new();
        let Ok(parsed) = format!("  {id}\n").parse::<SessionId>() else {
            panic!("expected a valid session id");
        };
        assert_eq!(parsed, id);
    }

    #[test]
    fn uppercase_reference_resolves_to_same_session() {
        let id = SessionId::new();
        let Ok(parsed) = id.to_string().to_uppercase().parse::<SessionId>() else {
            panic!("expected a valid session id");
        };
        assert_eq!(parsed, id);
        assert_eq!(parsed.to_string(), id.to_string());
    }

    #[test]
    fn rejects_non_uuid() {
        assert!("not-a-session".parse::<SessionId>().is_err());
        assert!("".parse::<SessionId>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = SessionId::new();
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{id}\""));
    }
}
