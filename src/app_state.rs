//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::service::{IngestService, ReplayCompositor, SessionService};
use crate::store::TelemetryStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Validation and routing of incoming telemetry.
    pub ingest: Arc<IngestService>,
    /// Replay document composition.
    pub replay: Arc<ReplayCompositor>,
    /// Session listings and dashboard queries.
    pub sessions: Arc<SessionService>,
    /// Largest accepted WebSocket message, in bytes.
    pub max_payload_bytes: usize,
}

impl AppState {
    /// Wires every service onto the same store.
    #[must_use]
    pub fn new(store: Arc<dyn TelemetryStore>, config: &GatewayConfig) -> Self {
        Self {
            ingest: Arc::new(IngestService::new(Arc::clone(&store))),
            replay: Arc::new(ReplayCompositor::from_config(Arc::clone(&store), config)),
            sessions: Arc::new(SessionService::new(store)),
            max_payload_bytes: config.max_payload_bytes,
        }
    }
}
