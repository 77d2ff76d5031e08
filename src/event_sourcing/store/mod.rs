// ============================================================================
// Event Sourcing Store - Generic Persistence Layer
// ============================================================================
//
// This module contains GENERIC persistence infrastructure for event sourcing.
// - event_log:       the contract any durable log must meet
// - memory/postgres: two logs meeting it
// - aggregate_store: record / reconstruct on top of any of them
//
// ============================================================================

pub mod aggregate_store;
pub mod event_log;
pub mod memory;
pub mod postgres;

pub use aggregate_store::{AggregateStore, StoreError};
pub use event_log::{EventLog, EventLogError, ExpectedVersion, NewEvent, RecordedEvent};
pub use memory::InMemoryEventLog;
pub use postgres::PgEventLog;
