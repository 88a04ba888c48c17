use thiserror::Error;

use ledger_core::{AccountId, DomainError};

use crate::event_store::EventStoreError;

/// Failure of a ledger command or query.
///
/// An insufficient balance is not an error: it ends a transfer with a
/// `MoneyTransferCancelled` event and the command still returns `Ok`.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A saga step referenced an account with no stream.
    ///
    /// Fatal for the chain: nothing was persisted for the failing step and the
    /// chain is not retried.
    #[error("aggregate {aggregate_id} does not exist (while handling {event_type})")]
    AggregateNotFound {
        aggregate_id: AccountId,
        event_type: &'static str,
    },

    /// Query for an account that was never created.
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error(transparent)]
    Store(#[from] EventStoreError),

    /// A stored stream could not be folded into an account.
    #[error("failed to replay account stream: {0}")]
    Replay(#[from] DomainError),

    #[error("aggregate lock poisoned for {0}")]
    LockPoisoned(String),
}
