//! Event-sourced bank account ledger.
//!
//! Aggregates raise events in memory, an [`AggregateStore`] records them to an
//! [`EventLog`] and rebuilds aggregates by replaying their streams.

pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;
pub mod utils;

pub use config::{AppConfig, DatabaseConfig};
pub use event_sourcing::{
    Aggregate, AggregateRoot, AggregateStore, DomainEvent, EventLog, EventLogError,
    InMemoryEventLog, PgEventLog, StoreError,
};
pub use metrics::Metrics;
