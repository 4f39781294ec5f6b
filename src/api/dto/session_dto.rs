//! Session listing, detail, and dashboard DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::SessionId;
use crate::service::DashboardSnapshot;
use crate::store::SessionSummary;

/// Session row for list and detail responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSummaryDto {
    /// Session identifier.
    #[schema(value_type = uuid::Uuid)]
    pub id: SessionId,
    /// URL of the recorded page.
    pub page_url: String,
    /// Title of the recorded page.
    pub page_title: String,
    /// Creation timestamp.
    pub start_time: DateTime<Utc>,
    /// Close timestamp; absent while active.
    pub end_time: Option<DateTime<Utc>>,
    /// Milliseconds between start and close; absent while active.
    pub duration_ms: Option<i64>,
    /// Whether the session still accepts events.
    pub is_active: bool,
    /// Number of recorded events.
    pub event_count: u64,
}

impl From<SessionSummary> for SessionSummaryDto {
    fn from(s: SessionSummary) -> Self {
        Self {
            id: s.id,
            duration_ms: s.end_time.map(|end| (end - s.start_time).num_milliseconds()),
            page_url: s.page_url,
            page_title: s.page_title,
            start_time: s.start_time,
            end_time: s.end_time,
            is_active: s.is_active,
            event_count: s.event_count,
        }
    }
}

/// Paginated list response for `GET /sessions`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionListResponse {
    /// Page of sessions, newest first.
    pub data: Vec<SessionSummaryDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Dashboard response for `GET /stats`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Sessions still accepting events.
    pub active_sessions: u64,
    /// All stored sessions.
    pub total_sessions: u64,
    /// All stored events.
    pub total_events: u64,
    /// Most recent sessions, newest first.
    pub recent_sessions: Vec<SessionSummaryDto>,
}

impl From<DashboardSnapshot> for StatsResponse {
    fn from(snapshot: DashboardSnapshot) -> Self {
        Self {
            active_sessions: snapshot.stats.active_sessions,
            total_sessions: snapshot.stats.total_sessions,
            total_events: snapshot.stats.total_events,
            recent_sessions: snapshot.recent.into_iter().map(Into::into).collect(),
        }
    }
}
