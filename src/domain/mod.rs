// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with value objects, events,
// errors and the aggregate implementation. Persistence lives in
// event_sourcing and is shared by every aggregate.
//
// ============================================================================

pub mod account;
