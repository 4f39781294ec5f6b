//! WebSocket layer: upgrade handler, connection loop, reply messages.
//!
//! `/ws` and `/ws/telemetry` accept a stateful ingestion stream. The
//! first `session_start` on a connection binds the session; following
//! events attach to it without naming it, and the session is closed when
//! the connection ends.

pub mod connection;
pub mod handler;
pub mod messages;
