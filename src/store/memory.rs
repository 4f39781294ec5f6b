//! In-process store with per-session fine-grained locking.
//!
//! [`MemoryStore`] keeps every session in a `HashMap` whose entries are
//! individually protected by a [`tokio::sync::RwLock`]. Appends to
//! different sessions run concurrently; appends to the same session are
//! serialized by that session's lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::{PurgeReport, RetentionFilter, SessionPage, SessionSummary, StoreStats};
use super::{StoreError, TelemetryStore};
use crate::domain::{NewEvent, NewSession, Session, SessionId, StoredEvent};

/// A session together with its event log, kept sorted by timestamp.
#[derive(Debug)]
struct SessionLog {
    session: Session,
    events: Vec<StoredEvent>,
}

impl SessionLog {
    fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.session.id,
            start_time: self.session.start_time,
            end_time: self.session.end_time,
            page_url: self.session.page_url.clone(),
            page_title: self.session.page_title.clone(),
            is_active: self.session.is_active,
            event_count: self.events.len() as u64,
        }
    }

    /// Inserts after every event with an equal or earlier timestamp.
    fn insert_ordered(&mut self, event: StoredEvent) {
        let at = self
            .events
            .partition_point(|existing| existing.timestamp <= event.timestamp);
        self.events.insert(at, event);
    }
}

/// Volatile [`TelemetryStore`] backend.
///
/// Used when persistence is disabled and throughout the test suite.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, Arc<RwLock<SessionLog>>>>,
    next_event_id: AtomicI64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn log(&self, id: SessionId) -> Option<Arc<RwLock<SessionLog>>> {
        self.sessions.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn create_session(&self, new: NewSession) -> Result<Session, StoreError> {
        let mut map = self.sessions.write().await;
        let mut id = SessionId::new();
        while map.contains_key(&id) {
            id = SessionId::new();
        }
        let session = Session::from_new(id, Utc::now(), new);
        map.insert(
            id,
            Arc::new(RwLock::new(SessionLog {
                session: session.clone(),
                events: Vec::new(),
            })),
        );
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        match self.log(id).await {
            Some(log) => Ok(Some(log.read().await.session.clone())),
            None => Ok(None),
        }
    }

    async fn append_event(&self, event: NewEvent) -> Result<StoredEvent, StoreError> {
        let log = self
            .log(event.session_id)
            .await
            .ok_or(StoreError::SessionNotFound(event.session_id))?;
        let mut log = log.write().await;
        if !log.session.is_active {
            return Err(StoreError::SessionClosed(event.session_id));
        }

        let stored = StoredEvent {
            id: self.next_event_id.fetch_add(1, Ordering::Relaxed).saturating_add(1),
            session_id: event.session_id,
            event_type: event.kind.as_str().to_string(),
            timestamp: event.timestamp,
            data: event.data,
            html_diff: event.html_diff,
        };
        log.insert_ordered(stored.clone());
        Ok(stored)
    }

    async fn list_events(&self, id: SessionId) -> Result<Vec<StoredEvent>, StoreError> {
        match self.log(id).await {
            Some(log) => Ok(log.read().await.events.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn close_session(&self, id: SessionId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let log = self.log(id).await.ok_or(StoreError::SessionNotFound(id))?;
        let mut log = log.write().await;
        if !log.session.is_active {
            return Ok(false);
        }
        log.session.is_active = false;
        log.session.end_time = Some(at);
        Ok(true)
    }

    async fn list_sessions(&self, offset: u64, limit: u64) -> Result<SessionPage, StoreError> {
        let map = self.sessions.read().await;
        let mut summaries = Vec::with_capacity(map.len());
        for log in map.values() {
            summaries.push(log.read().await.summary());
        }
        drop(map);

        summaries.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(a.id.cmp(&b.id)));
        let total = summaries.len() as u64;
        let sessions = summaries
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        Ok(SessionPage { sessions, total })
    }

    async fn session_summary(&self, id: SessionId) -> Result<Option<SessionSummary>, StoreError> {
        match self.log(id).await {
            Some(log) => Ok(Some(log.read().await.summary())),
            None => Ok(None),
        }
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let map = self.sessions.read().await;
        let mut stats = StoreStats::default();
        for log in map.values() {
            let log = log.read().await;
            stats.total_sessions += 1;
            if log.session.is_active {
                stats.active_sessions += 1;
            }
            stats.total_events += log.events.len() as u64;
        }
        Ok(stats)
    }

    async fn purge(
        &self,
        filter: RetentionFilter,
        dry_run: bool,
    ) -> Result<PurgeReport, StoreError> {
        let mut map = self.sessions.write().await;
        let mut report = PurgeReport {
            dry_run,
            ..PurgeReport::default()
        };
        let mut doomed = Vec::new();

        for (id, log) in map.iter() {
            let mut log = log.write().await;
            if filter.matches(log.session.start_time) {
                report.sessions += 1;
                report.events += log.events.len() as u64;
                doomed.push(*id);
                continue;
            }
            let expired = log
                .events
                .iter()
                .filter(|event| filter.matches(event.timestamp))
                .count();
            report.events += expired as u64;
            if !dry_run && expired > 0 {
                log.events.retain(|event| !filter.matches(event.timestamp));
            }
        }

        if !dry_run {
            for id in doomed {
                map.remove(&id);
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::EventKind;
    use serde_json::json;
    use tokio_test::assert_ok;

    async fn started(store: &MemoryStore) -> Session {
        let Ok(session) = store.create_session(NewSession::default()).await else {
            panic!("create_session failed");
        };
        session
    }

    fn event_at(session_id: SessionId, millis_after: i64, start: DateTime<Utc>) -> NewEvent {
        NewEvent {
            session_id,
            kind: EventKind::Click,
            timestamp: start + chrono::Duration::milliseconds(millis_after),
            data: json!({"n": millis_after}),
            html_diff: None,
        }
    }

    #[tokio::test]
    async fn created_session_resolves_immediately() {
        let store = MemoryStore::new();
        let session = started(&store).await;
        let found = assert_ok!(store.get_session(session.id).await);
        assert_eq!(found, Some(session));
    }

    #[tokio::test]
    async fn events_listed_by_timestamp_with_stable_ties() {
        let store = MemoryStore::new();
        let session = started(&store).await;
        let start = session.start_time;

        for offset in [30, 10, 20, 10] {
            assert_ok!(store.append_event(event_at(session.id, offset, start)).await);
        }

        let events = assert_ok!(store.list_events(session.id).await);
        let order: Vec<i64> = events
            .iter()
            .map(|e| e.data.get("n").and_then(serde_json::Value::as_i64).unwrap_or(-1))
            .collect();
        assert_eq!(order, vec![10, 10, 20, 30]);

        let ties: Vec<i64> = events.iter().take(2).map(|e| e.id).collect();
        assert!(ties.first() < ties.get(1), "equal timestamps keep insertion order");
    }

    #[tokio::test]
    async fn append_to_unknown_session_writes_nothing() {
        let store = MemoryStore::new();
        let ghost = SessionId::new();
        let result = store.append_event(event_at(ghost, 0, Utc::now())).await;
        assert!(matches!(result, Err(StoreError::SessionNotFound(id)) if id == ghost));
        assert_eq!(assert_ok!(store.stats().await).total_events, 0);
    }

    #[tokio::test]
    async fn closed_session_rejects_writes() {
        let store = MemoryStore::new();
        let session = started(&store).await;
        assert!(assert_ok!(store.close_session(session.id, Utc::now()).await));
        assert!(!assert_ok!(store.close_session(session.id, Utc::now()).await));

        let result = store.append_event(event_at(session.id, 1, session.start_time)).await;
        assert!(matches!(result, Err(StoreError::SessionClosed(_))));

        let Some(closed) = assert_ok!(store.get_session(session.id).await) else {
            panic!("closed session should still be readable");
        };
        assert!(!closed.is_active);
        assert!(closed.end_time.is_some());
    }

    #[tokio::test]
    async fn close_unknown_session_fails() {
        let store = MemoryStore::new();
        let result = store.close_session(SessionId::new(), Utc::now()).await;
        assert!(matches!(result, Err(StoreError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn concurrent_appends_to_one_session() {
        let store = Arc::new(MemoryStore::new());
        let session = started(&store).await;

        let mut handles = Vec::new();
        for n in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .append_event(NewEvent::accept(
                        session.id,
                        EventKind::Mousemove,
                        json!({"n": n}),
                    ))
                    .await
            }));
        }
        for handle in handles {
            let Ok(result) = handle.await else {
                panic!("task panicked");
            };
            assert_ok!(result);
        }

        let events = assert_ok!(store.list_events(session.id).await);
        assert_eq!(events.len(), 50);
        assert!(events.windows(2).all(|w| match w {
            [a, b] => a.timestamp <= b.timestamp,
            _ => true,
        }));
    }

    #[tokio::test]
    async fn sessions_listed_newest_first_with_counts() {
        let store = MemoryStore::new();
        let first = started(&store).await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = started(&store).await;
        assert_ok!(store.append_event(event_at(first.id, 1, first.start_time)).await);

        let page = assert_ok!(store.list_sessions(0, 10).await);
        assert_eq!(page.total, 2);
        let ids: Vec<SessionId> = page.sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(page.sessions.get(1).map(|s| s.event_count), Some(1));

        let tail = assert_ok!(store.list_sessions(1, 10).await);
        assert_eq!(tail.sessions.len(), 1);
    }

    #[tokio::test]
    async fn purge_before_cutoff_cascades_events() {
        let store = MemoryStore::new();
        let old = started(&store).await;
        assert_ok!(store.append_event(event_at(old.id, 1, old.start_time)).await);
        assert_ok!(store.append_event(event_at(old.id, 2, old.start_time)).await);

        let cutoff = Utc::now() + chrono::Duration::milliseconds(5);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let fresh = started(&store).await;
        // One fresh-session event predates the cutoff, one does not.
        assert_ok!(store.append_event(event_at(fresh.id, -60_000, fresh.start_time)).await);
        assert_ok!(store.append_event(event_at(fresh.id, 1, fresh.start_time)).await);

        let dry = assert_ok!(store.purge(RetentionFilter::before(cutoff), true).await);
        assert_eq!((dry.sessions, dry.events, dry.dry_run), (1, 3, true));
        assert_eq!(assert_ok!(store.stats().await).total_events, 4);

        let done = assert_ok!(store.purge(RetentionFilter::before(cutoff), false).await);
        assert_eq!((done.sessions, done.events), (1, 3));
        assert!(assert_ok!(store.get_session(old.id).await).is_none());
        assert!(assert_ok!(store.list_events(old.id).await).is_empty());
        assert_eq!(assert_ok!(store.list_events(fresh.id).await).len(), 1);
    }

    #[tokio::test]
    async fn purge_all_empties_store() {
        let store = MemoryStore::new();
        let session = started(&store).await;
        assert_ok!(store.append_event(event_at(session.id, 1, session.start_time)).await);

        let report = assert_ok!(store.purge(RetentionFilter::all(), false).await);
        assert_eq!((report.sessions, report.events), (1, 1));
        assert_eq!(assert_ok!(store.stats().await), StoreStats::default());
    }
}
