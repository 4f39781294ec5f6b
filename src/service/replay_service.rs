//! Replay composition: session + ordered events → [`ReplayDocument`].

use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::domain::snapshot::sanitize_snapshot;
use crate::domain::{ReplayDocument, SessionId};
use crate::error::GatewayError;
use crate::store::TelemetryStore;

/// Builds replay documents from stored sessions.
///
/// Composition is read-only and takes no locks beyond the store's own, so
/// a replay issued mid-session reflects the events committed so far.
#[derive(Debug, Clone)]
pub struct ReplayCompositor {
    store: Arc<dyn TelemetryStore>,
    timeout: Duration,
    unescape_snapshot: bool,
}

impl ReplayCompositor {
    /// Creates a compositor with an explicit time bound.
    #[must_use]
    pub fn new(store: Arc<dyn TelemetryStore>, timeout: Duration, unescape_snapshot: bool) -> Self {
        Self {
            store,
            timeout,
            unescape_snapshot,
        }
    }

    /// Creates a compositor using the replay settings of `config`.
    #[must_use]
    pub fn from_config(store: Arc<dyn TelemetryStore>, config: &GatewayConfig) -> Self {
        Self::new(store, config.replay_timeout(), config.replay_unescape_snapshot)
    }

    /// Composes the replay document of one session.
    ///
    /// Either every committed event is in the document or the call fails;
    /// a truncated timeline is never returned.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown session and
    /// [`GatewayError::StoreUnavailable`] if the store fails or the time
    /// bound elapses.
    pub async fn compose(&self, id: SessionId) -> Result<ReplayDocument, GatewayError> {
        match tokio::time::timeout(self.timeout, self.compose_unbounded(id)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::StoreUnavailable(format!(
                "replay of session {id} did not complete within {:?}",
                self.timeout
            ))),
        }
    }

    /// Composes and encodes the replay document as JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns whatever [`ReplayCompositor::compose`] returns, or
    /// [`GatewayError::Internal`] if encoding fails.
    pub async fn compose_json(&self, id: SessionId) -> Result<Vec<u8>, GatewayError> {
        let document = self.compose(id).await?;
        serde_json::to_vec(&document)
            .map_err(|e| GatewayError::Internal(format!("failed to encode replay document: {e}")))
    }

    /// Renders only the sandboxed base snapshot of a session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown session and
    /// [`GatewayError::StoreUnavailable`] if the store fails.
    pub async fn render_frame(&self, id: SessionId) -> Result<String, GatewayError> {
        let session = self
            .store
            .get_session(id)
            .await?
            .ok_or(GatewayError::NotFound(id))?;
        Ok(sanitize_snapshot(
            session.page_html.as_deref(),
            self.unescape_snapshot,
        ))
    }

    async fn compose_unbounded(&self, id: SessionId) -> Result<ReplayDocument, GatewayError> {
        let session = self
            .store
            .get_session(id)
            .await?
            .ok_or(GatewayError::NotFound(id))?;
        let mut events = self.store.list_events(id).await?;
        // Stable: equal timestamps keep the store's order.
        events.sort_by_key(|event| event.timestamp);

        let html = sanitize_snapshot(session.page_html.as_deref(), self.unescape_snapshot);
        let document = ReplayDocument::assemble(session, html, events);
        tracing::debug!(
            session_id = %id,
            events = document.session.event_count,
            "replay composed"
        );
        Ok(document)
    }
}
