use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Domain Event Contract
// ============================================================================
//
// Every aggregate owns a closed enum of event kinds. The enum knows how to
// name each kind and how to turn a kind's fields into a JSON payload and
// back. The event log only ever sees (event_type, payload) pairs.
//
// ============================================================================

/// Failure to turn a stored (event_type, payload) pair back into a typed event
#[derive(Debug, thiserror::Error)]
pub enum EventCodecError {
    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),

    #[error("Malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Generic Domain Event trait
///
/// Implemented by an aggregate's event enum. `decode` must match every kind
/// that `event_type` can produce and reject anything else.
pub trait DomainEvent: Sized + Clone + std::fmt::Debug + Send + Sync {
    /// Stable kind name stored beside the payload
    fn event_type(&self) -> &'static str;

    /// When the fact happened, fixed by the operation that raised it
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Payload schema version recorded with each event
    fn event_version() -> i32 {
        1
    }

    /// Serialize the fields of this kind (without the kind name)
    fn encode(&self) -> serde_json::Result<String>;

    /// Rebuild an event from its stored kind name and payload
    fn decode(event_type: &str, payload: &str) -> Result<Self, EventCodecError>;
}

// ============================================================================
// Event Serialization Helpers
// ============================================================================

pub fn serialize_event<E: Serialize>(event: &E) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

pub fn deserialize_event<E: for<'de> Deserialize<'de>>(json: &str) -> serde_json::Result<E> {
    serde_json::from_str(json)
}

// ============================================================================
// Tests
// ============================================================================
