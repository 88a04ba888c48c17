//! Step handlers of the transfer saga.

use chrono::Utc;
use tracing::{error, info, warn};

use ledger_accounts::{
    Account, AccountCreated, AccountCredited, AccountDebited, AccountEvent, CancelReason,
    DebitOutcome, MoneyTransferCancelled, MoneyTransferSucceeded, MoneyTransferred,
    TransferDetails,
};
use ledger_core::{AccountId, AggregateRoot, ExpectedVersion};
use ledger_events::Event;

use super::SagaOrchestrator;
use crate::error::LedgerError;
use crate::event_store::EventStore;

type Steps = Result<Vec<AccountEvent>, LedgerError>;

impl<S> SagaOrchestrator<S>
where
    S: EventStore<AccountEvent> + Clone,
{
    pub(super) fn on_created(&self, event: &AccountCreated) -> Steps {
        let id = event.aggregate_id;
        self.locks.with_lock(id, || {
            // A fresh id must not collide with an existing stream.
            self.store
                .append(AccountEvent::AccountCreated(event.clone()), ExpectedVersion::Exact(0))?;
            Ok(())
        })?;

        info!(account_id = %id, full_name = %event.full_name, "account created");
        Ok(vec![])
    }

    pub(super) fn on_transferred(&self, event: &MoneyTransferred) -> Steps {
        let t = event.transfer;
        self.persist_existing(AccountEvent::MoneyTransferred(event.clone()))?;

        if event.aggregate_id != t.from_id {
            return Ok(vec![]);
        }
        info!(from_id = %t.from_id, to_id = %t.to_id, value = %t.value, "transfer accepted");
        Ok(vec![debited(t)])
    }

    /// Replay, decide and append on the issuer under its lock.
    ///
    /// Both parties must exist before anything is debited, so a broken chain
    /// never leaves a reservation behind. On success the receiver gets its
    /// mirrored `MoneyTransferred` in a separate step, after the issuer's lock
    /// is released.
    pub(super) fn on_debited(&self, event: &AccountDebited) -> Steps {
        let t = event.transfer;
        let id = event.aggregate_id;
        let stored = AccountEvent::AccountDebited(event.clone());

        // Streams are never removed, so these checks stay true once they pass.
        self.ensure_exists(id, stored.event_type())?;
        self.ensure_exists(t.to_id, stored.event_type())?;

        let outcome = self.locks.with_lock(id, || {
            let mut account = self.require(id, stored.event_type())?;
            let version = account.version();
            let outcome = account.debit(event);
            if outcome == DebitOutcome::Debited {
                self.store
                    .append(stored.clone(), ExpectedVersion::Exact(version))?;
            }
            Ok(outcome)
        })?;

        match outcome {
            DebitOutcome::Debited => {
                self.persist_existing(mirrored(t))?;
                Ok(vec![credited(t)])
            }
            DebitOutcome::Rejected(reason) => {
                warn!(account_id = %id, value = %t.value, %reason, "debit rejected");
                Ok(vec![cancelled(id, t, reason)])
            }
        }
    }

    pub(super) fn on_credited(&self, event: &AccountCredited) -> Steps {
        let t = event.transfer;
        self.persist_existing(AccountEvent::AccountCredited(event.clone()))?;
        Ok(vec![succeeded(t.from_id, t), succeeded(t.to_id, t)])
    }

    pub(super) fn on_succeeded(&self, event: &MoneyTransferSucceeded) -> Steps {
        self.persist_existing(AccountEvent::MoneyTransferSucceeded(event.clone()))?;
        info!(account_id = %event.aggregate_id, value = %event.transfer.value, "transfer succeeded");
        Ok(vec![])
    }

    pub(super) fn on_cancelled(&self, event: &MoneyTransferCancelled) -> Steps {
        self.persist_existing(AccountEvent::MoneyTransferCancelled(event.clone()))?;
        info!(account_id = %event.aggregate_id, reason = %event.reason, "transfer cancelled");
        Ok(vec![])
    }

    /// Append to an account that must already exist.
    fn persist_existing(&self, event: AccountEvent) -> Result<(), LedgerError> {
        let id = event.aggregate_id();
        self.ensure_exists(id, event.event_type())?;
        self.locks.with_lock(id, || {
            self.store.append(event, ExpectedVersion::Any)?;
            Ok(())
        })
    }

    /// Fail the chain when `id` has no stream. Takes no lock.
    fn ensure_exists(&self, id: AccountId, event_type: &'static str) -> Result<(), LedgerError> {
        if self.store.exists(id)? {
            Ok(())
        } else {
            Err(aggregate_not_found(id, event_type))
        }
    }

    /// Current state of an account that must already exist. Caller holds its lock.
    fn require(&self, id: AccountId, event_type: &'static str) -> Result<Account, LedgerError> {
        self.accounts
            .load(id)?
            .ok_or_else(|| aggregate_not_found(id, event_type))
    }
}

fn aggregate_not_found(aggregate_id: AccountId, event_type: &'static str) -> LedgerError {
    error!(%aggregate_id, event_type, "aggregate does not exist, aborting saga chain");
    LedgerError::AggregateNotFound {
        aggregate_id,
        event_type,
    }
}

fn debited(transfer: TransferDetails) -> AccountEvent {
    AccountEvent::AccountDebited(AccountDebited {
        aggregate_id: transfer.from_id,
        transfer,
        occurred_at: Utc::now(),
    })
}

fn mirrored(transfer: TransferDetails) -> AccountEvent {
    AccountEvent::MoneyTransferred(MoneyTransferred {
        aggregate_id: transfer.to_id,
        transfer,
        occurred_at: Utc::now(),
    })
}

fn credited(transfer: TransferDetails) -> AccountEvent {
    AccountEvent::AccountCredited(AccountCredited {
        aggregate_id: transfer.to_id,
        transfer,
        occurred_at: Utc::now(),
    })
}

fn succeeded(aggregate_id: AccountId, transfer: TransferDetails) -> AccountEvent {
    AccountEvent::MoneyTransferSucceeded(MoneyTransferSucceeded {
        aggregate_id,
        transfer,
        occurred_at: Utc::now(),
    })
}

fn cancelled(aggregate_id: AccountId, transfer: TransferDetails, reason: CancelReason) -> AccountEvent {
    AccountEvent::MoneyTransferCancelled(MoneyTransferCancelled {
        aggregate_id,
        transfer,
        reason,
        occurred_at: Utc::now(),
    })
}
