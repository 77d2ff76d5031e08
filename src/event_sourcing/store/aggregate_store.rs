use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::event_log::{EventLog, EventLogError, ExpectedVersion, NewEvent};
use crate::event_sourcing::core::{Aggregate, AggregateRoot, EventCodecError};
use crate::metrics::Metrics;
use crate::utils::IsTransient;

// ============================================================================
// Aggregate Store - bridges aggregates to the event log
// ============================================================================
//
// record:      encode pending events -> one submit -> drain on success
// reconstruct: read full stream -> decode -> fold from the zero value
//
// No caching, no snapshots: every reconstruct replays from position 1.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Log(#[from] EventLogError),

    #[error("Unknown {aggregate_type} event kind '{event_type}' in stream {stream_id}")]
    UnknownEventKind {
        stream_id: Uuid,
        aggregate_type: &'static str,
        event_type: String,
    },

    #[error("Event codec error: {0}")]
    Codec(#[source] serde_json::Error),

    #[error("Sequence gap in stream {stream_id}: expected position {expected}, found {found}")]
    SequenceGap {
        stream_id: Uuid,
        expected: u64,
        found: u64,
    },

    #[error("Failed to apply event: {0}")]
    Apply(#[source] E),
}

impl<E> StoreError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The identity has no history at all
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Log(EventLogError::StreamNotFound(_)))
    }

    /// The log's view of the stream disagreed with the aggregate's
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::Log(
                EventLogError::StreamAlreadyExists(_)
                    | EventLogError::ConcurrentAppendConflict { .. }
            )
        )
    }

    /// Short label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            StoreError::Log(EventLogError::StreamNotFound(_)) => "stream_not_found",
            StoreError::Log(EventLogError::StreamAlreadyExists(_)) => "stream_already_exists",
            StoreError::Log(EventLogError::ConcurrentAppendConflict { .. }) => "conflict",
            StoreError::Log(EventLogError::EmptyBatch) => "empty_batch",
            StoreError::Log(EventLogError::Corrupted(_)) => "corrupted",
            StoreError::Log(EventLogError::Database(_)) => "database",
            StoreError::UnknownEventKind { .. } => "unknown_event_kind",
            StoreError::Codec(_) => "codec",
            StoreError::SequenceGap { .. } => "sequence_gap",
            StoreError::Apply(_) => "apply",
        }
    }
}

impl<E> IsTransient for StoreError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn is_transient(&self) -> bool {
        match self {
            StoreError::Log(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Store handle, built once and passed to whatever needs it
#[derive(Clone)]
pub struct AggregateStore {
    log: Arc<dyn EventLog>,
    metrics: Option<Arc<Metrics>>,
}

impl AggregateStore {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self { log, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Hand every pending event to the log in one submission
    ///
    /// Returns the stream version after the write. Pending events are only
    /// drained once the log has accepted them: a failed or abandoned call
    /// leaves them queued on the aggregate.
    pub async fn record<A: Aggregate>(
        &self,
        aggregate: &mut AggregateRoot<A>,
    ) -> Result<u64, StoreError<A::Error>> {
        if !aggregate.has_pending_events() {
            tracing::debug!(stream_id = %aggregate.id(), "Nothing pending, skipping record");
            return Ok(aggregate.version());
        }

        let stream_id = aggregate.id();
        let expected = ExpectedVersion::from_committed(aggregate.committed_version());
        let event_count = aggregate.pending_events().len();

        match self.submit::<A>(stream_id, expected, aggregate.pending_events()).await {
            Ok(new_version) => {
                aggregate.drain_pending_events();

                if let Some(metrics) = &self.metrics {
                    metrics.record_append(
                        A::aggregate_type(),
                        event_count,
                        expected == ExpectedVersion::NoStream,
                    );
                }

                tracing::info!(
                    stream_id = %stream_id,
                    aggregate_type = A::aggregate_type(),
                    new_version,
                    event_count,
                    "✅ Recorded aggregate events"
                );
                Ok(new_version)
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_append_failure(A::aggregate_type(), err.reason());
                }

                tracing::warn!(
                    stream_id = %stream_id,
                    aggregate_type = A::aggregate_type(),
                    ?expected,
                    event_count,
                    error = %err,
                    "Record failed, pending events kept"
                );
                Err(err)
            }
        }
    }

    async fn submit<A: Aggregate>(
        &self,
        stream_id: Uuid,
        expected: ExpectedVersion,
        events: &[A::Event],
    ) -> Result<u64, StoreError<A::Error>> {
        let batch = events
            .iter()
            .map(NewEvent::from_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Codec)?;

        Ok(self
            .log
            .submit(stream_id, A::aggregate_type(), expected, batch)
            .await?)
    }

    /// Replay the full stream for `id` into a fresh aggregate
    pub async fn reconstruct<A: Aggregate>(
        &self,
        id: Uuid,
    ) -> Result<AggregateRoot<A>, StoreError<A::Error>> {
        let started = Instant::now();
        let recorded = self.log.read_stream(id).await?;

        if recorded.is_empty() {
            return Err(EventLogError::StreamNotFound(id).into());
        }

        let mut events = Vec::with_capacity(recorded.len());
        for (index, record) in recorded.iter().enumerate() {
            let expected = index as u64 + 1;
            if record.sequence_number != expected {
                return Err(StoreError::SequenceGap {
                    stream_id: id,
                    expected,
                    found: record.sequence_number,
                });
            }

            let event = record.decode::<A::Event>().map_err(|err| match err {
                EventCodecError::UnknownEventKind(event_type) => StoreError::UnknownEventKind {
                    stream_id: id,
                    aggregate_type: A::aggregate_type(),
                    event_type,
                },
                EventCodecError::Payload(err) => StoreError::Codec(err),
            })?;

            tracing::debug!(
                stream_id = %id,
                sequence_number = record.sequence_number,
                event_type = %record.event_type,
                "Replaying event"
            );
            events.push(event);
        }

        let event_count = events.len();
        let aggregate = AggregateRoot::from_history(id, events).map_err(StoreError::Apply)?;

        if let Some(metrics) = &self.metrics {
            metrics.record_replay(
                A::aggregate_type(),
                event_count,
                started.elapsed().as_secs_f64(),
            );
        }

        tracing::info!(
            stream_id = %id,
            aggregate_type = A::aggregate_type(),
            version = aggregate.version(),
            "Reconstructed aggregate from event log"
        );
        Ok(aggregate)
    }

    /// Whether any history exists for `id`
    pub async fn exists(&self, id: Uuid) -> Result<bool, EventLogError> {
        Ok(self.log.stream_version(id).await?.is_some())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
