//! Per-account view of a transfer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledger_core::{AccountId, Money, TransactionId};

/// Lifecycle of a transaction: `New -> Pending -> {Succeeded | Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    New,
    Pending,
    Succeeded,
    Cancelled,
}

impl TransactionState {
    fn rank(self) -> u8 {
        match self {
            TransactionState::New => 0,
            TransactionState::Pending => 1,
            TransactionState::Succeeded | TransactionState::Cancelled => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    /// Whether moving to `next` goes strictly forward.
    pub fn can_advance_to(self, next: TransactionState) -> bool {
        next.rank() > self.rank()
    }
}

/// Direction of a transaction relative to the owning account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Incoming,
    Outgoing,
}

/// A transaction as seen by one account.
///
/// `value` is signed: negative on the issuer (`Outgoing`), positive on the
/// receiver (`Incoming`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub from_id: AccountId,
    pub to_id: AccountId,
    pub value: Money,
    pub state: TransactionState,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Move to `next` if it is a forward transition; otherwise leave the state as is.
    pub(crate) fn advance(&mut self, next: TransactionState, at: DateTime<Utc>) {
        if self.state.can_advance_to(next) {
            self.state = next;
            self.last_updated_at = at;
        }
    }
}
