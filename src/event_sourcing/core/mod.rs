// ============================================================================
// Event Sourcing Core - Generic Infrastructure Abstractions
// ============================================================================
//
// This module contains GENERIC, reusable event sourcing infrastructure
// that works with ANY domain aggregate.
//
// Key Principles:
// - No domain-specific code (no Account, Ledger, etc.)
// - Generic over aggregate types
// - No I/O: everything here is a synchronous, in-memory fold
//
// ============================================================================

pub mod aggregate;
pub mod event;

// Re-export core types for convenience
pub use aggregate::{Aggregate, AggregateRoot};
pub use event::{deserialize_event, serialize_event, DomainEvent, EventCodecError};
