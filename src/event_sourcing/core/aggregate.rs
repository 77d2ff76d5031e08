use std::fmt::Debug;
use uuid::Uuid;

use super::event::DomainEvent;

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// Key Principles:
// 1. State is derived from events (not stored directly)
// 2. Business operations synthesize events, then fold them in immediately
// 3. Events represent facts that have already happened
// 4. Replaying the same events from the zero value gives the same state
// 5. All state changes flow through apply_event
//
// ============================================================================

/// Generic Aggregate trait - the derived state of one event-sourced entity
///
/// `Default` is the zero value replay starts from.
///
/// `apply_event` must be a pure fold step: no I/O, no clock, no randomness.
/// It must also be all-or-nothing: check first, then mutate, so that an
/// `Err` leaves the state untouched.
pub trait Aggregate: Default + Clone + Debug + Send + Sync {
    type Event: DomainEvent;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Aggregate type name recorded with the stream (e.g. "Account")
    fn aggregate_type() -> &'static str;

    /// Fold one event into the current state
    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;
}

/// Identity, version and not-yet-recorded events around an aggregate's state
///
/// The state is only reachable through `state()`, so nothing outside
/// `Aggregate::apply_event` can change a derived field.
#[derive(Debug, Clone)]
pub struct AggregateRoot<A: Aggregate> {
    id: Uuid,
    version: u64,
    state: A,
    pending: Vec<A::Event>,
}

impl<A: Aggregate> AggregateRoot<A> {
    fn blank(id: Uuid, version: u64, state: A) -> Self {
        Self {
            id,
            version,
            state,
            pending: Vec::new(),
        }
    }

    /// Start a brand new aggregate from its "created" event
    pub fn create(id: Uuid, created: A::Event) -> Result<Self, A::Error> {
        let mut root = Self::blank(id, 0, A::default());
        root.raise(created)?;
        Ok(root)
    }

    /// Rebuild an aggregate by folding its full history from the zero value
    pub fn from_history<I>(id: Uuid, events: I) -> Result<Self, A::Error>
    where
        I: IntoIterator<Item = A::Event>,
    {
        Self::replay_onto(id, 0, A::default(), events)
    }

    /// Fold further events onto a state already known to be at `version`
    ///
    /// `from_history` is this with (0, zero value). Snapshot-based loading
    /// would enter here with a stored state instead. Crate-private: a state
    /// that did not come out of a fold must never reach a stream.
    pub(crate) fn replay_onto<I>(id: Uuid, version: u64, state: A, events: I) -> Result<Self, A::Error>
    where
        I: IntoIterator<Item = A::Event>,
    {
        let mut root = Self::blank(id, version, state);
        for event in events {
            root.state.apply_event(&event)?;
            root.version += 1;
        }
        Ok(root)
    }

    /// Apply a freshly synthesized event and queue it for recording
    ///
    /// Both happen or neither does: the event is only queued once the fold
    /// step has accepted it.
    pub fn raise(&mut self, event: A::Event) -> Result<(), A::Error> {
        self.state.apply_event(&event)?;
        self.version += 1;
        self.pending.push(event);
        Ok(())
    }

    /// Take every pending event in the order it was raised, leaving none behind
    pub fn drain_pending_events(&mut self) -> Vec<A::Event> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending_events(&self) -> &[A::Event] {
        &self.pending
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of events applied so far, recorded or not
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Version the event log is expected to be at
    pub fn committed_version(&self) -> u64 {
        self.version - self.pending.len() as u64
    }

    pub fn state(&self) -> &A {
        &self.state
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::core::event::{
        deserialize_event, serialize_event, EventCodecError,
    };
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum TallyEvent {
        Started { label: String },
        Added { by: i64 },
    }

    impl DomainEvent for TallyEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TallyEvent::Started { .. } => "TallyStarted",
                TallyEvent::Added { .. } => "TallyAdded",
            }
        }

        fn occurred_at(&self) -> chrono::DateTime<chrono::Utc> {
            chrono::DateTime::<chrono::Utc>::UNIX_EPOCH
        }

        fn encode(&self) -> serde_json::Result<String> {
            serialize_event(self)
        }

        fn decode(event_type: &str, payload: &str) -> Result<Self, EventCodecError> {
            match event_type {
                "TallyStarted" | "TallyAdded" => Ok(deserialize_event(payload)?),
                other => Err(EventCodecError::UnknownEventKind(other.to_string())),
            }
        }
    }

    #[derive(Debug, thiserror::Error)]
    enum TallyError {
        #[error("tally not started")]
        NotStarted,
        #[error("tally already started")]
        AlreadyStarted,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tally {
        label: Option<String>,
        sum: i64,
        additions: u32,
    }

    impl Aggregate for Tally {
        type Event = TallyEvent;
        type Error = TallyError;

        fn aggregate_type() -> &'static str {
            "Tally"
        }

        fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
            match event {
                TallyEvent::Started { label } => {
                    if self.label.is_some() {
                        return Err(TallyError::AlreadyStarted);
                    }
                    self.label = Some(label.clone());
                }
                TallyEvent::Added { by } => {
                    if self.label.is_none() {
                        return Err(TallyError::NotStarted);
                    }
                    self.sum += by;
                    self.additions += 1;
                }
            }
            Ok(())
        }
    }

    fn started() -> TallyEvent {
        TallyEvent::Started { label: "t".to_string() }
    }

    #[test]
    fn test_create_queues_exactly_the_created_event() {
        let id = Uuid::new_v4();
        let tally = AggregateRoot::<Tally>::create(id, started()).unwrap();

        assert_eq!(tally.id(), id);
        assert_eq!(tally.version(), 1);
        assert_eq!(tally.committed_version(), 0);
        assert_eq!(tally.pending_events(), &[started()]);
        assert_eq!(tally.state().label.as_deref(), Some("t"));
    }

    #[test]
    fn test_raise_applies_and_queues_in_order() {
        let mut tally = AggregateRoot::<Tally>::create(Uuid::new_v4(), started()).unwrap();
        tally.raise(TallyEvent::Added { by: 2 }).unwrap();
        tally.raise(TallyEvent::Added { by: 3 }).unwrap();

        assert_eq!(tally.state().sum, 5);
        assert_eq!(tally.version(), 3);
        assert_eq!(
            tally.pending_events(),
            &[started(), TallyEvent::Added { by: 2 }, TallyEvent::Added { by: 3 }]
        );
    }

    #[test]
    fn test_drain_twice_returns_nothing_the_second_time() {
        let mut tally = AggregateRoot::<Tally>::create(Uuid::new_v4(), started()).unwrap();
        tally.raise(TallyEvent::Added { by: 1 }).unwrap();

        let first = tally.drain_pending_events();
        let second = tally.drain_pending_events();

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert!(!tally.has_pending_events());
        assert_eq!(tally.committed_version(), tally.version());
        // draining never touches derived state
        assert_eq!(tally.state().sum, 1);
    }

    #[test]
    fn test_incremental_and_batch_replay_agree() {
        let id = Uuid::new_v4();
        let mut live = AggregateRoot::<Tally>::create(id, started()).unwrap();
        for by in [7, -2, 40, 0, -13] {
            live.raise(TallyEvent::Added { by }).unwrap();
        }

        let history = live.drain_pending_events();
        let replayed = AggregateRoot::<Tally>::from_history(id, history).unwrap();

        assert_eq!(replayed.state(), live.state());
        assert_eq!(replayed.version(), live.version());
        assert!(!replayed.has_pending_events());
    }

    #[test]
    fn test_replay_onto_known_state_matches_full_replay() {
        let id = Uuid::new_v4();
        let history = vec![
            started(),
            TallyEvent::Added { by: 10 },
            TallyEvent::Added { by: 5 },
            TallyEvent::Added { by: -1 },
        ];

        let full = AggregateRoot::<Tally>::from_history(id, history.clone()).unwrap();
        let prefix = AggregateRoot::<Tally>::from_history(id, history[..2].to_vec()).unwrap();
        let resumed = AggregateRoot::<Tally>::replay_onto(
            id,
            prefix.version(),
            prefix.state().clone(),
            history[2..].to_vec(),
        )
        .unwrap();

        assert_eq!(resumed.state(), full.state());
        assert_eq!(resumed.version(), 4);
    }

    #[test]
    fn test_rejected_event_is_neither_applied_nor_queued() {
        let mut tally = AggregateRoot::<Tally>::create(Uuid::new_v4(), started()).unwrap();
        let before = tally.state().clone();

        let err = tally.raise(started()).unwrap_err();

        assert!(matches!(err, TallyError::AlreadyStarted));
        assert_eq!(tally.state(), &before);
        assert_eq!(tally.pending_events().len(), 1);
        assert_eq!(tally.version(), 1);
    }

    #[test]
    fn test_history_must_begin_with_created_event() {
        let result = AggregateRoot::<Tally>::from_history(
            Uuid::new_v4(),
            vec![TallyEvent::Added { by: 1 }],
        );
        assert!(matches!(result, Err(TallyError::NotStarted)));
    }
}
