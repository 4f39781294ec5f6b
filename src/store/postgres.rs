//! PostgreSQL implementation of the telemetry store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{PurgeReport, RetentionFilter, SessionPage, SessionSummary, StoreStats};
use super::{StoreError, TelemetryStore};
use crate::domain::{NewEvent, NewSession, Session, SessionId, StoredEvent};

const SESSION_COLUMNS: &str = "id, start_time, end_time, page_url, page_title, user_agent, \
     screen_width, screen_height, window_width, window_height, is_active, page_html, page_styles";

const SUMMARY_SELECT: &str = "SELECT s.id, s.start_time, s.end_time, s.page_url, s.page_title, \
     s.is_active, (SELECT COUNT(*) FROM events e WHERE e.session_id = s.id) AS event_count \
     FROM sessions s";

/// Attempts before giving up on a colliding generated id.
const MAX_ID_ATTEMPTS: usize = 3;

/// A row from the `sessions` table.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    page_url: String,
    page_title: String,
    user_agent: String,
    screen_width: i32,
    screen_height: i32,
    window_width: i32,
    window_height: i32,
    is_active: bool,
    page_html: Option<String>,
    page_styles: Option<String>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            id: SessionId::from_uuid(row.id),
            start_time: row.start_time,
            end_time: row.end_time,
            page_url: row.page_url,
            page_title: row.page_title,
            user_agent: row.user_agent,
            screen_width: row.screen_width,
            screen_height: row.screen_height,
            window_width: row.window_width,
            window_height: row.window_height,
            is_active: row.is_active,
            page_html: row.page_html,
            page_styles: row.page_styles,
        }
    }
}

/// A session listing row with its event count.
#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    page_url: String,
    page_title: String,
    is_active: bool,
    event_count: i64,
}

impl From<SummaryRow> for SessionSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: SessionId::from_uuid(row.id),
            start_time: row.start_time,
            end_time: row.end_time,
            page_url: row.page_url,
            page_title: row.page_title,
            is_active: row.is_active,
            event_count: to_count(row.event_count),
        }
    }
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// PostgreSQL-backed store using `sqlx::PgPool`.
///
/// Event ordering uses `(timestamp, id)`: `id` is a `BIGSERIAL`, so equal
/// timestamps replay in insertion order. Deleting a session cascades to its
/// events through the foreign key.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn is_active(&self, id: SessionId) -> Result<Option<bool>, StoreError> {
        let active =
            sqlx::query_scalar::<_, bool>("SELECT is_active FROM sessions WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(active)
    }
}

#[async_trait]
impl TelemetryStore for PostgresStore {
    async fn create_session(&self, new: NewSession) -> Result<Session, StoreError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = SessionId::new();
            let start_time = Utc::now();
            let inserted = sqlx::query(
                "INSERT INTO sessions (id, start_time, page_url, page_title, user_agent, \
                 screen_width, screen_height, window_width, window_height, page_html, page_styles) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(id.as_uuid())
            .bind(start_time)
            .bind(&new.page_url)
            .bind(&new.page_title)
            .bind(&new.user_agent)
            .bind(new.screen_width)
            .bind(new.screen_height)
            .bind(new.window_width)
            .bind(new.window_height)
            .bind(new.page_html.as_deref())
            .bind(new.page_styles.as_deref())
            .execute(&self.pool)
            .await?
            .rows_affected();

            if inserted == 1 {
                return Ok(Session::from_new(id, start_time, new));
            }
            tracing::warn!(session_id = %id, "generated session id collided; retrying");
        }
        Err(StoreError::Unavailable(
            "could not allocate a unique session id".to_string(),
        ))
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Session::from))
    }

    async fn append_event(&self, event: NewEvent) -> Result<StoredEvent, StoreError> {
        let event_type = event.kind.as_str();
        // Existence and activity are checked inside the INSERT itself.
        let row_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO events (session_id, event_type, timestamp, data, html_diff) \
             SELECT id, $2, $3, $4, $5 FROM sessions WHERE id = $1 AND is_active \
             RETURNING id",
        )
        .bind(event.session_id.as_uuid())
        .bind(event_type)
        .bind(event.timestamp)
        .bind(&event.data)
        .bind(event.html_diff.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        match row_id {
            Some(id) => Ok(StoredEvent {
                id,
                session_id: event.session_id,
                event_type: event_type.to_string(),
                timestamp: event.timestamp,
                data: event.data,
                html_diff: event.html_diff,
            }),
            None => match self.is_active(event.session_id).await? {
                None => Err(StoreError::SessionNotFound(event.session_id)),
                Some(_) => Err(StoreError::SessionClosed(event.session_id)),
            },
        }
    }

    async fn list_events(&self, id: SessionId) -> Result<Vec<StoredEvent>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, Uuid, String, DateTime<Utc>, Value, Option<String>)>(
            "SELECT id, session_id, event_type, timestamp, data, html_diff FROM events \
             WHERE session_id = $1 ORDER BY timestamp ASC, id ASC",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, session_id, event_type, timestamp, data, html_diff)| StoredEvent {
                    id,
                    session_id: SessionId::from_uuid(session_id),
                    event_type,
                    timestamp,
                    data,
                    html_diff,
                },
            )
            .collect())
    }

    async fn close_session(&self, id: SessionId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let closed = sqlx::query(
            "UPDATE sessions SET end_time = $2, is_active = FALSE WHERE id = $1 AND is_active",
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if closed == 1 {
            return Ok(true);
        }
        match self.is_active(id).await? {
            None => Err(StoreError::SessionNotFound(id)),
            Some(_) => Ok(false),
        }
    }

    async fn list_sessions(&self, offset: u64, limit: u64) -> Result<SessionPage, StoreError> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT} ORDER BY s.start_time DESC, s.id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(to_sql_int(limit))
        .bind(to_sql_int(offset))
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await?;

        Ok(SessionPage {
            sessions: rows.into_iter().map(SessionSummary::from).collect(),
            total: to_count(total),
        })
    }

    async fn session_summary(&self, id: SessionId) -> Result<Option<SessionSummary>, StoreError> {
        let row = sqlx::query_as::<_, SummaryRow>(&format!("{SUMMARY_SELECT} WHERE s.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SessionSummary::from))
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let (active, sessions, events) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT (SELECT COUNT(*) FROM sessions WHERE is_active), \
                    (SELECT COUNT(*) FROM sessions), \
                    (SELECT COUNT(*) FROM events)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            active_sessions: to_count(active),
            total_sessions: to_count(sessions),
            total_events: to_count(events),
        })
    }

    async fn purge(
        &self,
        filter: RetentionFilter,
        dry_run: bool,
    ) -> Result<PurgeReport, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sessions = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sessions WHERE $1::timestamptz IS NULL OR start_time < $1",
        )
        .bind(filter.before)
        .fetch_one(&mut *tx)
        .await?;

        let events = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM events e WHERE $1::timestamptz IS NULL OR e.timestamp < $1 \
             OR e.session_id IN (SELECT id FROM sessions WHERE start_time < $1)",
        )
        .bind(filter.before)
        .fetch_one(&mut *tx)
        .await?;

        let report = PurgeReport {
            sessions: to_count(sessions),
            events: to_count(events),
            dry_run,
        };

        if dry_run {
            tx.rollback().await?;
            return Ok(report);
        }

        sqlx::query("DELETE FROM events WHERE $1::timestamptz IS NULL OR timestamp < $1")
            .bind(filter.before)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE $1::timestamptz IS NULL OR start_time < $1")
            .bind(filter.before)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            sessions = report.sessions,
            events = report.events,
            "retention sweep committed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_row_maps_every_column() {
        let id = Uuid::new_v4();
        let start = Utc::now();
        let row = SessionRow {
            id,
            start_time: start,
            end_time: None,
            page_url: "https://x.test".to_string(),
            page_title: "X".to_string(),
            user_agent: "UA".to_string(),
            screen_width: 1920,
            screen_height: 1080,
            window_width: 800,
            window_height: 600,
            is_active: true,
            page_html: Some("<body></body>".to_string()),
            page_styles: None,
        };
        let session = Session::from(row);
        assert_eq!(session.id, SessionId::from_uuid(id));
        assert_eq!(session.start_time, start);
        assert_eq!((session.window_width, session.window_height), (800, 600));
        assert_eq!(session.page_html.as_deref(), Some("<body></body>"));
        assert!(session.is_active);
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(to_count(-1), 0);
        assert_eq!(to_count(42), 42);
        assert_eq!(to_sql_int(u64::MAX), i64::MAX);
    }
}
