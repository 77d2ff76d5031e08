use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::event_sourcing::core::{DomainEvent, EventCodecError};
use crate::utils::IsTransient;

// ============================================================================
// Event Log Contract - the durable, append-only collaborator
// ============================================================================
//
// One stream per aggregate identity. The log assigns positions
// (1-based sequence numbers), keeps append order, and serializes writers
// on the same stream. Every call is a single commit: all events of a call
// become visible together or not at all.
//
// ============================================================================

/// An event handed to the log, not yet positioned
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub event_version: i32,
    pub payload: String,
    pub occurred_at: DateTime<Utc>,
}

impl NewEvent {
    /// Build an event that occurs now
    pub fn new(event_type: impl Into<String>, event_version: i32, payload: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event_type.into(),
            event_version,
            payload: payload.into(),
            occurred_at: Utc::now(),
        }
    }

    /// Encode a typed domain event for submission, keeping its own timestamp
    pub fn from_domain<E: DomainEvent>(event: &E) -> serde_json::Result<Self> {
        Ok(Self {
            occurred_at: event.occurred_at(),
            ..Self::new(event.event_type(), E::event_version(), event.encode()?)
        })
    }
}

/// An event as stored in a stream
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub stream_id: Uuid,
    pub sequence_number: u64,
    pub event_id: Uuid,
    pub event_type: String,
    pub event_version: i32,
    pub payload: String,
    pub occurred_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl RecordedEvent {
    pub fn decode<E: DomainEvent>(&self) -> Result<E, EventCodecError> {
        E::decode(&self.event_type, &self.payload)
    }
}

/// Where the writer believes the stream head is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The stream must not exist yet
    NoStream,
    /// The stream must exist with exactly this many events
    Exact(u64),
}

impl ExpectedVersion {
    pub fn from_committed(version: u64) -> Self {
        if version == 0 {
            ExpectedVersion::NoStream
        } else {
            ExpectedVersion::Exact(version)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("Stream not found: {0}")]
    StreamNotFound(Uuid),

    #[error("Stream already exists: {0}")]
    StreamAlreadyExists(Uuid),

    #[error("Concurrency conflict on stream {stream_id}: expected version {expected}, but current is {actual}")]
    ConcurrentAppendConflict {
        stream_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("Cannot append empty event list")]
    EmptyBatch,

    #[error("Stored stream is corrupted: {0}")]
    Corrupted(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IsTransient for EventLogError {
    fn is_transient(&self) -> bool {
        match self {
            EventLogError::Database(err) => match err {
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
                // serialization_failure, deadlock_detected
                sqlx::Error::Database(db) => {
                    matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
                }
                _ => false,
            },
            _ => false,
        }
    }
}

/// Durable per-stream event log
///
/// `submit` decides between starting and appending from the expected
/// version, so callers never branch on it themselves.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Create the stream with its first events. Fails if it already exists.
    async fn start_stream(
        &self,
        stream_id: Uuid,
        aggregate_type: &str,
        events: Vec<NewEvent>,
    ) -> Result<u64, EventLogError>;

    /// Append to an existing stream whose head is at `expected_version`
    async fn append_to_stream(
        &self,
        stream_id: Uuid,
        expected_version: u64,
        events: Vec<NewEvent>,
    ) -> Result<u64, EventLogError>;

    /// Full history in append order
    async fn read_stream(&self, stream_id: Uuid) -> Result<Vec<RecordedEvent>, EventLogError>;

    /// Current head version, or None if the stream does not exist
    async fn stream_version(&self, stream_id: Uuid) -> Result<Option<u64>, EventLogError>;

    async fn submit(
        &self,
        stream_id: Uuid,
        aggregate_type: &str,
        expected: ExpectedVersion,
        events: Vec<NewEvent>,
    ) -> Result<u64, EventLogError> {
        match expected {
            ExpectedVersion::NoStream => self.start_stream(stream_id, aggregate_type, events).await,
            ExpectedVersion::Exact(version) => {
                self.append_to_stream(stream_id, version, events).await
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_version_from_committed() {
        assert_eq!(ExpectedVersion::from_committed(0), ExpectedVersion::NoStream);
        assert_eq!(ExpectedVersion::from_committed(3), ExpectedVersion::Exact(3));
    }

    #[test]
    fn test_new_event_ids_are_unique() {
        let a = NewEvent::new("Tally", 1, "{}");
        let b = NewEvent::new("Tally", 1, "{}");
        assert_ne!(a.event_id, b.event_id);
        assert_eq!(a.event_type, "Tally");
    }

    #[test]
    fn test_contract_errors_are_permanent() {
        let id = Uuid::new_v4();
        assert!(!EventLogError::StreamNotFound(id).is_transient());
        assert!(!EventLogError::StreamAlreadyExists(id).is_transient());
        assert!(!EventLogError::ConcurrentAppendConflict {
            stream_id: id,
            expected: 1,
            actual: 2
        }
        .is_transient());
        assert!(!EventLogError::EmptyBatch.is_transient());
    }

    #[test]
    fn test_database_io_is_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(EventLogError::Database(sqlx::Error::Io(io)).is_transient());
        assert!(EventLogError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!EventLogError::Database(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_conflict_message() {
        let id = Uuid::nil();
        let err = EventLogError::ConcurrentAppendConflict {
            stream_id: id,
            expected: 3,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            format!("Concurrency conflict on stream {id}: expected version 3, but current is 4")
        );
    }
}
