//! Facts recorded in an account's stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledger_core::{AccountId, Money, TransactionId};
use ledger_events::Event;

/// Why a transfer was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelReason {
    /// The issuer could not cover the amount.
    BalanceTooLow,
    /// Administrative cancellation after an internal failure.
    InternalServerError,
}

impl core::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            CancelReason::BalanceTooLow => "BALANCE_TOO_LOW",
            CancelReason::InternalServerError => "INTERNAL_SERVER_ERROR",
        })
    }
}

/// The parties and amount of one transfer, shared by every event of its saga.
///
/// `value` is the positive transferred amount; sign is derived per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDetails {
    pub from_id: AccountId,
    pub to_id: AccountId,
    pub transaction_id: TransactionId,
    pub value: Money,
}

/// Event: AccountCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreated {
    pub aggregate_id: AccountId,
    pub full_name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MoneyTransferred (a transfer was recorded on `aggregate_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyTransferred {
    pub aggregate_id: AccountId,
    #[serde(flatten)]
    pub transfer: TransferDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AccountDebited (funds reserved out of the issuer's balance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDebited {
    pub aggregate_id: AccountId,
    #[serde(flatten)]
    pub transfer: TransferDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AccountCredited (funds reserved for the receiver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCredited {
    pub aggregate_id: AccountId,
    #[serde(flatten)]
    pub transfer: TransferDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MoneyTransferSucceeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyTransferSucceeded {
    pub aggregate_id: AccountId,
    #[serde(flatten)]
    pub transfer: TransferDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MoneyTransferCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyTransferCancelled {
    pub aggregate_id: AccountId,
    #[serde(flatten)]
    pub transfer: TransferDetails,
    pub reason: CancelReason,
    pub occurred_at: DateTime<Utc>,
}

/// Every fact an account stream can hold.
///
/// Replay and the transfer saga match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    AccountCreated(AccountCreated),
    MoneyTransferred(MoneyTransferred),
    AccountDebited(AccountDebited),
    AccountCredited(AccountCredited),
    MoneyTransferSucceeded(MoneyTransferSucceeded),
    MoneyTransferCancelled(MoneyTransferCancelled),
}

impl AccountEvent {
    /// Transfer details, for every kind except `AccountCreated`.
    pub fn transfer(&self) -> Option<&TransferDetails> {
        match self {
            AccountEvent::AccountCreated(_) => None,
            AccountEvent::MoneyTransferred(e) => Some(&e.transfer),
            AccountEvent::AccountDebited(e) => Some(&e.transfer),
            AccountEvent::AccountCredited(e) => Some(&e.transfer),
            AccountEvent::MoneyTransferSucceeded(e) => Some(&e.transfer),
            AccountEvent::MoneyTransferCancelled(e) => Some(&e.transfer),
        }
    }
}

impl Event for AccountEvent {
    type AggregateId = AccountId;

    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::AccountCreated(_) => "account.created",
            AccountEvent::MoneyTransferred(_) => "account.money_transferred",
            AccountEvent::AccountDebited(_) => "account.debited",
            AccountEvent::AccountCredited(_) => "account.credited",
            AccountEvent::MoneyTransferSucceeded(_) => "account.transfer_succeeded",
            AccountEvent::MoneyTransferCancelled(_) => "account.transfer_cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::AccountCreated(e) => e.occurred_at,
            AccountEvent::MoneyTransferred(e) => e.occurred_at,
            AccountEvent::AccountDebited(e) => e.occurred_at,
            AccountEvent::AccountCredited(e) => e.occurred_at,
            AccountEvent::MoneyTransferSucceeded(e) => e.occurred_at,
            AccountEvent::MoneyTransferCancelled(e) => e.occurred_at,
        }
    }

    fn aggregate_id(&self) -> AccountId {
        match self {
            AccountEvent::AccountCreated(e) => e.aggregate_id,
            AccountEvent::MoneyTransferred(e) => e.aggregate_id,
            AccountEvent::AccountDebited(e) => e.aggregate_id,
            AccountEvent::AccountCredited(e) => e.aggregate_id,
            AccountEvent::MoneyTransferSucceeded(e) => e.aggregate_id,
            AccountEvent::MoneyTransferCancelled(e) => e.aggregate_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> TransferDetails {
        TransferDetails {
            from_id: AccountId::new(),
            to_id: AccountId::new(),
            transaction_id: TransactionId::new(),
            value: Money::from_minor(1_000),
        }
    }

    #[test]
    fn aggregate_id_can_differ_from_transfer_parties() {
        let transfer = details();
        let mirrored = AccountEvent::MoneyTransferred(MoneyTransferred {
            aggregate_id: transfer.to_id,
            transfer,
            occurred_at: Utc::now(),
        });

        assert_eq!(mirrored.aggregate_id(), transfer.to_id);
        assert_eq!(mirrored.transfer().map(|t| t.from_id), Some(transfer.from_id));
        assert_eq!(mirrored.event_type(), "account.money_transferred");
    }

    #[test]
    fn cancel_reason_uses_wire_names() {
        let json = serde_json::to_string(&CancelReason::BalanceTooLow).unwrap();
        assert_eq!(json, "\"BALANCE_TOO_LOW\"");
        assert_eq!(CancelReason::InternalServerError.to_string(), "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn transfer_fields_are_flattened() {
        let transfer = details();
        let event = MoneyTransferCancelled {
            aggregate_id: transfer.from_id,
            transfer,
            reason: CancelReason::BalanceTooLow,
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["value"], "10.00");
        assert_eq!(json["reason"], "BALANCE_TOO_LOW");

        let back: MoneyTransferCancelled = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
