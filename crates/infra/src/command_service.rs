//! Command surface of the ledger.
//!
//! Each command mints ids, builds the initiating event and hands it to the
//! [`SagaOrchestrator`]. The whole resulting chain runs on the caller's thread:
//!
//! ```text
//! Command
//!   ↓
//! 1. Build initiating event (fresh AccountId / TransactionId)
//!   ↓
//! 2. Dispatch: persist, then process follow-ups FIFO under per-account locks
//!   ↓
//! 3. Return the minted id (acknowledgment, not outcome)
//! ```
//!
//! Callers pre-validate input (distinct accounts, positive amount, existing
//! ids). The only rule enforced here is balance sufficiency, and its failure is
//! reported through the account's transaction state, not through `Err`.

use chrono::Utc;
use tracing::info;

use ledger_accounts::{
    AccountCreated, AccountEvent, CancelReason, MoneyTransferCancelled, MoneyTransferred,
    TransferDetails,
};
use ledger_core::{AccountId, Money, TransactionId};

use crate::error::LedgerError;
use crate::event_store::EventStore;
use crate::saga::SagaOrchestrator;

pub struct CommandService<S> {
    saga: SagaOrchestrator<S>,
}

impl<S> CommandService<S>
where
    S: EventStore<AccountEvent> + Clone,
{
    pub fn new(store: S) -> Self {
        Self {
            saga: SagaOrchestrator::new(store),
        }
    }

    /// Open an account with the initial balance and return its id.
    pub fn create_account(&self, full_name: impl Into<String>) -> Result<AccountId, LedgerError> {
        let id = AccountId::new();
        self.saga.dispatch(AccountEvent::AccountCreated(AccountCreated {
            aggregate_id: id,
            full_name: full_name.into(),
            occurred_at: Utc::now(),
        }))?;
        Ok(id)
    }

    /// Start a transfer of `value` from `from_id` to `to_id`.
    ///
    /// `Ok` means the transfer was accepted and its chain ran to the end; poll
    /// the returned transaction on either account to learn whether it
    /// succeeded or was cancelled.
    pub fn transfer_money(
        &self,
        from_id: AccountId,
        to_id: AccountId,
        value: Money,
    ) -> Result<TransactionId, LedgerError> {
        let transfer = TransferDetails {
            from_id,
            to_id,
            transaction_id: TransactionId::new(),
            value,
        };

        self.saga.dispatch(AccountEvent::MoneyTransferred(MoneyTransferred {
            aggregate_id: from_id,
            transfer,
            occurred_at: Utc::now(),
        }))?;
        Ok(transfer.transaction_id)
    }

    /// Record a cancellation directly on `aggregate_id` (administrative entry point).
    pub fn cancel_transaction(
        &self,
        aggregate_id: AccountId,
        transfer: TransferDetails,
        reason: CancelReason,
    ) -> Result<(), LedgerError> {
        info!(
            account_id = %aggregate_id,
            transaction_id = %transfer.transaction_id,
            %reason,
            "cancellation requested"
        );
        self.saga.dispatch(AccountEvent::MoneyTransferCancelled(MoneyTransferCancelled {
            aggregate_id,
            transfer,
            reason,
            occurred_at: Utc::now(),
        }))
    }
}
