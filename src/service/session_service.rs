//! Read-side session queries: listing, detail, dashboard, retention.

use std::sync::Arc;

use crate::domain::SessionId;
use crate::error::GatewayError;
use crate::store::{
    PurgeReport, RetentionFilter, SessionPage, SessionSummary, StoreStats, TelemetryStore,
};

/// Number of sessions shown on the dashboard.
pub const RECENT_SESSIONS: u64 = 10;

/// Aggregate counters plus the most recent sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    /// Store-wide counters.
    pub stats: StoreStats,
    /// Up to [`RECENT_SESSIONS`] sessions, newest first.
    pub recent: Vec<SessionSummary>,
}

/// Query facade over the store for dashboards and maintenance tools.
#[derive(Debug, Clone)]
pub struct SessionService {
    store: Arc<dyn TelemetryStore>,
}

impl SessionService {
    /// Creates a new `SessionService`.
    #[must_use]
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Lists one page of sessions, newest first. `page` is 1-indexed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreUnavailable`] if the store fails.
    pub async fn list(&self, page: u32, per_page: u32) -> Result<SessionPage, GatewayError> {
        let limit = u64::from(per_page.max(1));
        let offset = u64::from(page.max(1).saturating_sub(1)).saturating_mul(limit);
        Ok(self.store.list_sessions(offset, limit).await?)
    }

    /// Summary of one session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the session does not exist.
    pub async fn summary(&self, id: SessionId) -> Result<SessionSummary, GatewayError> {
        self.store
            .session_summary(id)
            .await?
            .ok_or(GatewayError::NotFound(id))
    }

    /// Counters and recent sessions for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreUnavailable`] if the store fails.
    pub async fn dashboard(&self) -> Result<DashboardSnapshot, GatewayError> {
        let stats = self.store.stats().await?;
        let recent = self.store.list_sessions(0, RECENT_SESSIONS).await?.sessions;
        Ok(DashboardSnapshot { stats, recent })
    }

    /// Deletes sessions and events matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreUnavailable`] if the store fails.
    pub async fn purge(
        &self,
        filter: RetentionFilter,
        dry_run: bool,
    ) -> Result<PurgeReport, GatewayError> {
        let report = self.store.purge(filter, dry_run).await?;
        tracing::info!(
            sessions = report.sessions,
            events = report.events,
            dry_run,
            "telemetry purge finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::assert_ok;

    use crate::domain::{EventKind, NewEvent, NewSession};
    use crate::store::MemoryStore;

    async fn populated(sessions: usize) -> (SessionService, Vec<SessionId>) {
        let store: Arc<dyn TelemetryStore> = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for i in 0..sessions {
            let new = NewSession {
                page_url: format!("https://x.test/{i}"),
                ..NewSession::default()
            };
            let session = assert_ok!(store.create_session(new).await);
            ids.push(session.id);
        }
        (SessionService::new(store), ids)
    }

    #[tokio::test]
    async fn list_pages_through_sessions() {
        let (service, _) = populated(5).await;
        let first = assert_ok!(service.list(1, 2).await);
        assert_eq!(first.total, 5);
        assert_eq!(first.sessions.len(), 2);
        let last = assert_ok!(service.list(3, 2).await);
        assert_eq!(last.sessions.len(), 1);
        let beyond = assert_ok!(service.list(9, 2).await);
        assert!(beyond.sessions.is_empty());
    }

    #[tokio::test]
    async fn page_zero_is_treated_as_first() {
        let (service, _) = populated(3).await;
        let page = assert_ok!(service.list(0, 10).await);
        assert_eq!(page.sessions.len(), 3);
    }

    #[tokio::test]
    async fn summary_of_unknown_session_is_not_found() {
        let (service, _) = populated(0).await;
        let result = service.summary(SessionId::new()).await;
        assert!(matches!(result, Err(GatewayError::NotFound(_))));
    }

    #[tokio::test]
    async fn dashboard_counts_and_caps_recent() {
        let (service, ids) = populated(12).await;
        let Some(first) = ids.first().copied() else {
            panic!("no sessions created");
        };
        assert_ok!(
            service
                .store
                .append_event(NewEvent::accept(first, EventKind::Click, json!({"x": 1, "y": 2})))
                .await
        );

        let dashboard = assert_ok!(service.dashboard().await);
        assert_eq!(dashboard.stats.total_sessions, 12);
        assert_eq!(dashboard.stats.active_sessions, 12);
        assert_eq!(dashboard.stats.total_events, 1);
        assert_eq!(dashboard.recent.len(), 10);
    }

    #[tokio::test]
    async fn dry_run_purge_keeps_data() {
        let (service, _) = populated(2).await;
        let report = assert_ok!(service.purge(RetentionFilter::all(), true).await);
        assert_eq!(report.sessions, 2);
        assert!(report.dry_run);
        let stats = assert_ok!(service.dashboard().await).stats;
        assert_eq!(stats.total_sessions, 2);

        let report = assert_ok!(service.purge(RetentionFilter::all(), false).await);
        assert_eq!(report.sessions, 2);
        let stats = assert_ok!(service.dashboard().await).stats;
        assert_eq!(stats.total_sessions, 0);
    }
}
