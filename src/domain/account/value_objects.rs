use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Account Value Objects
// ============================================================================

/// Signed amount of money in minor units (cents)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn from_major(units: i64) -> Self {
        Self(units.saturating_mul(100))
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
