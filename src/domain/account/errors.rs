use super::value_objects::Money;

// ============================================================================
// Account Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Account has not been opened")]
    NotOpened,

    #[error("Account is already open")]
    AlreadyOpened,

    #[error("Owner name cannot be empty")]
    EmptyOwnerName,

    #[error("Account is already named {0}")]
    NameUnchanged(String),

    #[error("Transaction description cannot be empty")]
    EmptyDescription,

    #[error("Transaction amount cannot be zero")]
    ZeroAmount,

    #[error("Balance overflow: {total} + {amount}")]
    BalanceOverflow { total: Money, amount: Money },
}
