use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::event_log::{EventLog, EventLogError, NewEvent, RecordedEvent};

// ============================================================================
// In-Memory Event Log - for tests and local development
// ============================================================================
//
// Streams live in a map behind one lock, so each call is atomic with
// respect to every other call. Clones share the same streams.
//
// ============================================================================

#[derive(Debug)]
struct Stream {
    aggregate_type: String,
    events: Vec<RecordedEvent>,
}

impl Stream {
    fn version(&self) -> u64 {
        self.events.len() as u64
    }

    fn push_all(&mut self, stream_id: Uuid, events: Vec<NewEvent>) -> u64 {
        let recorded_at = Utc::now();
        for event in events {
            let sequence_number = self.version() + 1;
            self.events.push(RecordedEvent {
                stream_id,
                sequence_number,
                event_id: event.event_id,
                event_type: event.event_type,
                event_version: event.event_version,
                payload: event.payload,
                occurred_at: event.occurred_at,
                recorded_at,
            });
        }
        self.version()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryEventLog {
    streams: Arc<RwLock<HashMap<Uuid, Stream>>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    pub async fn aggregate_type_of(&self, stream_id: Uuid) -> Option<String> {
        self.streams
            .read()
            .await
            .get(&stream_id)
            .map(|stream| stream.aggregate_type.clone())
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn start_stream(
        &self,
        stream_id: Uuid,
        aggregate_type: &str,
        events: Vec<NewEvent>,
    ) -> Result<u64, EventLogError> {
        if events.is_empty() {
            return Err(EventLogError::EmptyBatch);
        }

        let mut streams = self.streams.write().await;
        if streams.contains_key(&stream_id) {
            return Err(EventLogError::StreamAlreadyExists(stream_id));
        }

        let mut stream = Stream {
            aggregate_type: aggregate_type.to_string(),
            events: Vec::with_capacity(events.len()),
        };
        let version = stream.push_all(stream_id, events);
        streams.insert(stream_id, stream);

        tracing::debug!(stream_id = %stream_id, aggregate_type, version, "Started in-memory stream");
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

        let mut streams = self.streams.write().await;
        let stream = streams
            .get_mut(&stream_id)
            .ok_or(EventLogError::StreamNotFound(stream_id))?;

        if stream.version() != expected_version {
            return Err(EventLogError::ConcurrentAppendConflict {
                stream_id,
                expected: expected_version,
                actual: stream.version(),
            });
        }

        let version = stream.push_all(stream_id, events);
        tracing::debug!(stream_id = %stream_id, version, "Appended to in-memory stream");
        Ok(version)
    }

    async fn read_stream(&self, stream_id: Uuid) -> Result<Vec<RecordedEvent>, EventLogError> {
        self.streams
            .read()
            .await
            .get(&stream_id)
            .map(|stream| stream.events.clone())
            .ok_or(EventLogError::StreamNotFound(stream_id))
    }

    async fn stream_version(&self, stream_id: Uuid) -> Result<Option<u64>, EventLogError> {
        Ok(self.streams.read().await.get(&stream_id).map(Stream::version))
    }
}
