//! Service layer: ingestion, replay composition, and session queries.
//!
//! Services own an `Arc<dyn TelemetryStore>` and hold no other state.
//! Handlers on both the REST and WebSocket surfaces call into the same
//! services, so validation and routing rules are identical across them.

pub mod ingest_service;
pub mod replay_service;
pub mod session_service;

pub use ingest_service::{IngestOutcome, IngestService, SessionContext, Surface};
pub use replay_service::ReplayCompositor;
pub use session_service::{DashboardSnapshot, SessionService};
