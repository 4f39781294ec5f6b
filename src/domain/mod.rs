//! Domain layer: session and event model, event kind catalog, replay
//! document, and snapshot sanitization.
//!
//! Nothing here touches storage or transport. The store, services, and
//! both ingestion surfaces are built on these types.

pub mod event;
pub mod event_kind;
pub mod replay;
pub mod session;
pub mod session_id;
pub mod snapshot;

pub use event::{NewEvent, StoredEvent, contains_nul, html_diff_of};
pub use event_kind::{EventKind, MessageKind};
pub use replay::{ReplayDocument, ReplayEvent, ReplaySession};
pub use session::{NewSession, Session, SessionStartPayload};
pub use session_id::SessionId;
