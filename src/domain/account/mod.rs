// ============================================================================
// Account Domain - Business Logic for the Bank Account Aggregate
// ============================================================================
//
// This module contains ALL Account-specific code:
// - Value objects (Money)
// - Events (AccountOpened, TransactionRecorded, AccountRenamed)
// - Errors (AccountError enum)
// - Aggregate (Account state and BankAccount operations)
//
// The generic event sourcing infrastructure knows nothing about accounts.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod errors;
pub mod aggregate;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use errors::*;
pub use aggregate::*;
