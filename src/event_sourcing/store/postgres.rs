use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::event_log::{EventLog, EventLogError, NewEvent, RecordedEvent};
use crate::config::DatabaseConfig;

// ============================================================================
// PostgreSQL Event Log
// ============================================================================
//
// Responsibilities:
// 1. Keep one head row per stream (event_streams) holding its version
// 2. Append events to event_log (append-only, PK = stream + position)
// 3. Enforce optimistic concurrency by moving the head with
//    UPDATE ... WHERE version = expected
// 4. Run every call in a single transaction
//
// ============================================================================

const CREATE_STREAMS_TABLE: &str = "CREATE TABLE IF NOT EXISTS event_streams (
    stream_id UUID PRIMARY KEY,
    aggregate_type TEXT NOT NULL,
    version BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)";

const CREATE_EVENTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS event_log (
    stream_id UUID NOT NULL REFERENCES event_streams (stream_id),
    sequence_number BIGINT NOT NULL,
    event_id UUID NOT NULL UNIQUE,
    event_type TEXT NOT NULL,
    event_version INT NOT NULL,
    payload TEXT NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (stream_id, sequence_number)
)";

type EventRow = (Uuid, i64, Uuid, String, i32, String, DateTime<Utc>, DateTime<Utc>);

#[derive(Debug, Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, EventLogError> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL event log"
        );
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they are missing
    pub async fn ensure_schema(&self) -> Result<(), EventLogError> {
        sqlx::query(CREATE_STREAMS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_EVENTS_TABLE).execute(&self.pool).await?;
        tracing::debug!("Event log schema is in place");
        Ok(())
    }

    async fn insert_events(
        tx: &mut Transaction<'_, Postgres>,
        stream_id: Uuid,
        from_version: u64,
        events: Vec<NewEvent>,
    ) -> Result<u64, EventLogError> {
        let recorded_at = Utc::now();
        let mut version = from_version;

        for event in events {
            version += 1;
            sqlx::query(
                "INSERT INTO event_log (
                    stream_id, sequence_number, event_id, event_type, event_version,
                    payload, occurred_at, recorded_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(stream_id)
            .bind(to_db_version(version)?)
            .bind(event.event_id)
            .bind(event.event_type)
            .bind(event.event_version)
            .bind(event.payload)
            .bind(event.occurred_at)
            .bind(recorded_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok(version)
    }

    async fn head_version(
        tx: &mut Transaction<'_, Postgres>,
        stream_id: Uuid,
    ) -> Result<Option<u64>, EventLogError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM event_streams WHERE stream_id = $1")
                .bind(stream_id)
                .fetch_optional(&mut **tx)
                .await?;

        row.map(|(version,)| from_db_version(version)).transpose()
    }
}

fn to_db_version(version: u64) -> Result<i64, EventLogError> {
    i64::try_from(version)
        .map_err(|_| EventLogError::Corrupted(format!("version {version} exceeds BIGINT")))
}

fn from_db_version(version: i64) -> Result<u64, EventLogError> {
    u64::try_from(version)
        .map_err(|_| EventLogError::Corrupted(format!("negative version {version}")))
}

#[async_trait]
impl EventLog for PgEventLog {
    async fn start_stream(
        &self,
        stream_id: Uuid,
        aggregate_type: &str,
        events: Vec<NewEvent>,
    ) -> Result<u64, EventLogError> {
        if events.is_empty() {
            return Err(EventLogError::EmptyBatch);
        }
        let event_count = events.len();

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let inserted = sqlx::query(
            "INSERT INTO event_streams (stream_id, aggregate_type, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)
             ON CONFLICT (stream_id) DO NOTHING",
        )
        .bind(stream_id)
        .bind(aggregate_type)
        .bind(to_db_version(event_count as u64)?)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // a concurrent start on the same id waits for the winner, then inserts nothing
        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(EventLogError::StreamAlreadyExists(stream_id));
        }

        let version = Self::insert_events(&mut tx, stream_id, 0, events).await?;
        tx.commit().await?;

        tracing::info!(
            stream_id = %stream_id,
            aggregate_type,
            new_version = version,
            event_count,
            "✅ Started stream in event log"
        );
        Ok(version)
    }

    async fn append_to_stream(
        &self,
        stream_id: Uuid,
        expected_version: u64,
        events: Vec<NewEvent>,
    ) -> Result<u64, EventLogError> {
        if events.is_empty() {
            return Err(EventLogError::EmptyBatch);
        }
        let event_count = events.len();
        let new_version = expected_version + event_count as u64;

        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            "UPDATE event_streams SET version = $1, updated_at = $2
             WHERE stream_id = $3 AND version = $4",
        )
        .bind(to_db_version(new_version)?)
        .bind(Utc::now())
        .bind(stream_id)
        .bind(to_db_version(expected_version)?)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            let actual = Self::head_version(&mut tx, stream_id).await?;
            tx.rollback().await?;
            return Err(match actual {
                None => EventLogError::StreamNotFound(stream_id),
                Some(actual) => {
                    tracing::warn!(
                        stream_id = %stream_id,
                        expected = expected_version,
                        actual,
                        "Append rejected by version check"
                    );
                    EventLogError::ConcurrentAppendConflict {
                        stream_id,
                        expected: expected_version,
                        actual,
                    }
                }
            });
        }

        let version = Self::insert_events(&mut tx, stream_id, expected_version, events).await?;
        tx.commit().await?;

        tracing::info!(
            stream_id = %stream_id,
            new_version = version,
            event_count,
            "✅ Appended events to event log"
        );
        Ok(version)
    }

    async fn read_stream(&self, stream_id: Uuid) -> Result<Vec<RecordedEvent>, EventLogError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT stream_id, sequence_number, event_id, event_type, event_version,
                    payload, occurred_at, recorded_at
             FROM event_log
             WHERE stream_id = $1
             ORDER BY sequence_number ASC",
        )
        .bind(stream_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(EventLogError::StreamNotFound(stream_id));
        }

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let (
                stream_id,
                sequence_number,
                event_id,
                event_type,
                event_version,
                payload,
                occurred_at,
                recorded_at,
            ) = row;

            events.push(RecordedEvent {
                stream_id,
                sequence_number: from_db_version(sequence_number)?,
                event_id,
                event_type,
                event_version,
                payload,
                occurred_at,
                recorded_at,
            });
        }

        tracing::debug!(stream_id = %stream_id, event_count = events.len(), "Loaded stream");
        Ok(events)
    }

    async fn stream_version(&self, stream_id: Uuid) -> Result<Option<u64>, EventLogError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM event_streams WHERE stream_id = $1")
                .bind(stream_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(version,)| from_db_version(version)).transpose()
    }
}

// ============================================================================
// Tests
// ============================================================================
//
// The database tests need a reachable PostgreSQL instance:
//   DATABASE_URL=postgres://... cargo test -- --ignored
//
// ============================================================================
