use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event_sourcing::core::{deserialize_event, serialize_event, DomainEvent, EventCodecError};
use super::value_objects::Money;

// ============================================================================
// Account Events - Domain Events for the Account Aggregate
// ============================================================================

pub const ACCOUNT_OPENED: &str = "AccountOpened";
pub const TRANSACTION_RECORDED: &str = "TransactionRecorded";
pub const ACCOUNT_RENAMED: &str = "AccountRenamed";

/// Account Event - closed set of everything that can happen to an account
#[derive(Debug, Clone, PartialEq)]
pub enum AccountEvent {
    Opened(AccountOpened),
    TransactionRecorded(TransactionRecorded),
    Renamed(AccountRenamed),
}

impl DomainEvent for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::Opened(_) => ACCOUNT_OPENED,
            AccountEvent::TransactionRecorded(_) => TRANSACTION_RECORDED,
            AccountEvent::Renamed(_) => ACCOUNT_RENAMED,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::Opened(e) => e.occurred_at,
            AccountEvent::TransactionRecorded(e) => e.occurred_at,
            AccountEvent::Renamed(e) => e.occurred_at,
        }
    }

    fn encode(&self) -> serde_json::Result<String> {
        match self {
            AccountEvent::Opened(e) => serialize_event(e),
            AccountEvent::TransactionRecorded(e) => serialize_event(e),
            AccountEvent::Renamed(e) => serialize_event(e),
        }
    }

    fn decode(event_type: &str, payload: &str) -> Result<Self, EventCodecError> {
        match event_type {
            ACCOUNT_OPENED => Ok(AccountEvent::Opened(deserialize_event(payload)?)),
            TRANSACTION_RECORDED => Ok(AccountEvent::TransactionRecorded(deserialize_event(payload)?)),
            ACCOUNT_RENAMED => Ok(AccountEvent::Renamed(deserialize_event(payload)?)),
            other => Err(EventCodecError::UnknownEventKind(other.to_string())),
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Account Opened - first event of every account stream
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccountOpened {
    pub owner_name: String,
    pub opening_balance: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Transaction Recorded - money moved in (positive) or out (negative)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransactionRecorded {
    pub transaction_id: Uuid,
    pub description: String,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Account Renamed - owner name changed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccountRenamed {
    pub previous_name: String,
    pub new_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_year() -> DateTime<Utc> {
        "2024-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_each_kind_decodes_from_its_own_payload() {
        let events = vec![
            AccountEvent::Opened(AccountOpened {
                owner_name: "Ada".to_string(),
                opening_balance: Money::from_major(5),
                occurred_at: Utc::now(),
            }),
            AccountEvent::TransactionRecorded(TransactionRecorded {
                transaction_id: Uuid::new_v4(),
                description: "Westpac transfer".to_string(),
                amount: Money::from_major(500),
                occurred_at: Utc::now(),
            }),
            AccountEvent::Renamed(AccountRenamed {
                previous_name: "Ada".to_string(),
                new_name: "Ada L.".to_string(),
                occurred_at: Utc::now(),
            }),
        ];

        for event in events {
            let payload = event.encode().unwrap();
            let decoded = AccountEvent::decode(event.event_type(), &payload).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn test_payload_shape_is_stable() {
        let event = AccountEvent::Opened(AccountOpened {
            owner_name: "Ada".to_string(),
            opening_balance: Money::from_cents(150),
            occurred_at: new_year(),
        });
        assert_eq!(
            event.encode().unwrap(),
            r#"{"owner_name":"Ada","opening_balance":150,"occurred_at":"2024-01-01T00:00:00Z"}"#
        );
        assert_eq!(event.occurred_at(), new_year());
    }

    #[test]
    fn test_kind_and_payload_must_agree() {
        let opened = r#"{"owner_name":"Ada","opening_balance":0,"occurred_at":"2024-01-01T00:00:00Z"}"#;
        let err = AccountEvent::decode(TRANSACTION_RECORDED, opened).unwrap_err();
        assert!(matches!(err, EventCodecError::Payload(_)));
    }

    #[test]
    fn test_unknown_kind() {
        let err = AccountEvent::decode("AccountClosed", "{}").unwrap_err();
        assert!(matches!(err, EventCodecError::UnknownEventKind(kind) if kind == "AccountClosed"));
    }
}
