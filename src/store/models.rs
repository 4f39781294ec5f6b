//! Aggregate and retention models returned by the store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::SessionId;

/// Session row plus its event count, for listing views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Creation time.
    pub start_time: DateTime<Utc>,
    /// Close time.
    pub end_time: Option<DateTime<Utc>>,
    /// Recorded page URL.
    pub page_url: String,
    /// Recorded page title.
    pub page_title: String,
    /// Whether the session is still recording.
    pub is_active: bool,
    /// Number of stored events.
    pub event_count: u64,
}

/// One page of sessions, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPage {
    /// Sessions on this page.
    pub sessions: Vec<SessionSummary>,
    /// Total number of sessions in the store.
    pub total: u64,
}

/// Aggregate counts for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Sessions still recording.
    pub active_sessions: u64,
    /// All sessions.
    pub total_sessions: u64,
    /// All events.
    pub total_events: u64,
}

/// Which rows a retention sweep removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionFilter {
    /// Remove sessions started and events recorded before this instant.
    /// `None` removes everything.
    pub before: Option<DateTime<Utc>>,
}

impl RetentionFilter {
    /// Filter that matches every row.
    #[must_use]
    pub const fn all() -> Self {
        Self { before: None }
    }

    /// Filter that matches rows older than `before`.
    #[must_use]
    pub const fn before(before: DateTime<Utc>) -> Self {
        Self {
            before: Some(before),
        }
    }

    /// Returns `true` if a row stamped `at` falls inside the filter.
    #[must_use]
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        self.before.is_none_or(|cutoff| at < cutoff)
    }
}

/// Row counts affected (or, in a dry run, that would be affected) by a
/// retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Sessions removed.
    pub sessions: u64,
    /// Events removed, including those cascaded from removed sessions.
    pub events: u64,
    /// Whether the sweep was a dry run.
    pub dry_run: bool,
}
