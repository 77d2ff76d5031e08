use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::event_sourcing::core::{Aggregate, AggregateRoot};
use super::errors::AccountError;
use super::events::*;
use super::value_objects::Money;

// ============================================================================
// Account Aggregate - Domain Logic
// ============================================================================

/// Derived state of one bank account
///
/// Fields are private: the only writer is `apply_event`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Account {
    owner_name: String,
    total: Money,
    transaction_count: u64,
    opened: bool,
    last_transaction_at: Option<DateTime<Utc>>,
}

/// An account together with its identity, version and pending events
pub type BankAccount = AggregateRoot<Account>;

impl Account {
    fn ensure_opened(&self) -> Result<(), AccountError> {
        if self.opened {
            Ok(())
        } else {
            Err(AccountError::NotOpened)
        }
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for Account {
    type Event = AccountEvent;
    type Error = AccountError;

    fn aggregate_type() -> &'static str {
        "Account"
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            AccountEvent::Opened(e) => {
                if self.opened {
                    return Err(AccountError::AlreadyOpened);
                }
                self.owner_name = e.owner_name.clone();
                self.total = e.opening_balance;
                self.opened = true;
            }
            AccountEvent::TransactionRecorded(e) => {
                self.ensure_opened()?;
                self.total = self.total.checked_add(e.amount).ok_or(
                    AccountError::BalanceOverflow {
                        total: self.total,
                        amount: e.amount,
                    },
                )?;
                self.transaction_count += 1;
                self.last_transaction_at = Some(e.occurred_at);
            }
            AccountEvent::Renamed(e) => {
                self.ensure_opened()?;
                self.owner_name = e.new_name.clone();
            }
        }
        Ok(())
    }
}

// ============================================================================
// Business Operations
// ============================================================================
//
// Each operation validates its inputs, synthesizes one event (ids and
// timestamps are chosen here, never inside apply_event) and raises it.
//
// ============================================================================

impl AggregateRoot<Account> {
    /// Open a new account; the opening event is left pending
    pub fn open(
        id: Uuid,
        owner_name: impl Into<String>,
        opening_balance: Money,
    ) -> Result<Self, AccountError> {
        let owner_name = owner_name.into();
        if owner_name.trim().is_empty() {
            return Err(AccountError::EmptyOwnerName);
        }

        tracing::debug!(account_id = %id, owner = %owner_name, %opening_balance, "Opening account");

        Self::create(
            id,
            AccountEvent::Opened(AccountOpened {
                owner_name,
                opening_balance,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Record money moving in or out; returns the new transaction id
    pub fn record_transaction(
        &mut self,
        description: impl Into<String>,
        amount: Money,
    ) -> Result<Uuid, AccountError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(AccountError::EmptyDescription);
        }
        if amount.is_zero() {
            return Err(AccountError::ZeroAmount);
        }

        let transaction_id = Uuid::new_v4();
        self.raise(AccountEvent::TransactionRecorded(TransactionRecorded {
            transaction_id,
            description,
            amount,
            occurred_at: Utc::now(),
        }))?;

        tracing::debug!(account_id = %self.id(), %transaction_id, %amount, "Recorded transaction");
        Ok(transaction_id)
    }

    pub fn rename(&mut self, new_name: impl Into<String>) -> Result<(), AccountError> {
        let new_name = new_name.into();
        if new_name.trim().is_empty() {
            return Err(AccountError::EmptyOwnerName);
        }
        if new_name == self.state().owner_name {
            return Err(AccountError::NameUnchanged(new_name));
        }

        self.raise(AccountEvent::Renamed(AccountRenamed {
            previous_name: self.state().owner_name.clone(),
            new_name,
            occurred_at: Utc::now(),
        }))
    }

    pub fn total(&self) -> Money {
        self.state().total
    }

    pub fn transaction_count(&self) -> u64 {
        self.state().transaction_count
    }

    pub fn owner_name(&self) -> &str {
        &self.state().owner_name
    }

    pub fn last_transaction_at(&self) -> Option<DateTime<Utc>> {
        self.state().last_transaction_at
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
