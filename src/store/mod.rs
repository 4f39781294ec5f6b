//! Persistence layer: durable sessions and their time-ordered event logs.
//!
//! [`TelemetryStore`] is the contract the ingestion and replay services
//! require. Two backends implement it: [`PostgresStore`] for production and
//! [`MemoryStore`] for development and tests. Both append events
//! atomically, list them by `(timestamp, insertion order)`, and delete a
//! session's events together with the session.

pub mod memory;
pub mod models;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;

use crate::config::GatewayConfig;
use crate::domain::{NewEvent, NewSession, Session, SessionId, StoredEvent};

pub use memory::MemoryStore;
pub use models::{PurgeReport, RetentionFilter, SessionPage, SessionSummary, StoreStats};
pub use postgres::PostgresStore;

/// Errors raised by a [`TelemetryStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No session with this id exists.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The session has ended and is read-only.
    #[error("session {0} is closed")]
    SessionClosed(SessionId),

    /// The backend failed or could not be reached.
    #[error("{0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Unavailable(format!("migration failed: {err}"))
    }
}

/// Storage contract for sessions and events.
///
/// Writes are visible to any read issued after the write returns. Each
/// method is a single atomic operation; callers never observe a partially
/// written event.
#[async_trait]
pub trait TelemetryStore: Send + Sync + std::fmt::Debug {
    /// Creates an active session with a freshly generated id.
    async fn create_session(&self, new: NewSession) -> Result<Session, StoreError>;

    /// Looks up a session by id.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// Appends an event to an active session.
    ///
    /// Fails with [`StoreError::SessionNotFound`] or
    /// [`StoreError::SessionClosed`] without writing anything.
    async fn append_event(&self, event: NewEvent) -> Result<StoredEvent, StoreError>;

    /// Lists a session's events by ascending timestamp; equal timestamps
    /// keep insertion order.
    async fn list_events(&self, id: SessionId) -> Result<Vec<StoredEvent>, StoreError>;

    /// Marks a session ended at `at`.
    ///
    /// Returns `true` if this call closed it, `false` if it was already
    /// closed. Fails with [`StoreError::SessionNotFound`] for unknown ids.
    async fn close_session(&self, id: SessionId, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Lists sessions newest first.
    async fn list_sessions(&self, offset: u64, limit: u64) -> Result<SessionPage, StoreError>;

    /// Returns one session's summary.
    async fn session_summary(&self, id: SessionId) -> Result<Option<SessionSummary>, StoreError>;

    /// Aggregate counts.
    async fn stats(&self) -> Result<StoreStats, StoreError>;

    /// Deletes sessions and events matched by `filter`. With `dry_run` set,
    /// only counts them.
    async fn purge(&self, filter: RetentionFilter, dry_run: bool)
    -> Result<PurgeReport, StoreError>;
}

/// Builds the store selected by configuration.
///
/// With persistence enabled this connects to PostgreSQL and runs the
/// embedded migrations; otherwise it returns an empty [`MemoryStore`].
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the database cannot be reached
/// or a migration fails.
pub async fn connect(config: &GatewayConfig) -> Result<Arc<dyn TelemetryStore>, StoreError> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled; sessions are kept in memory only");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    let store = PostgresStore::new(pool);
    store.migrate().await?;
    tracing::info!("connected to postgres");
    Ok(Arc::new(store))
}
