//! Money-transfer saga (choreographed).
//!
//! There is no saga instance with its own state: each handler persists one
//! event to one account and returns the follow-up events, so the progress of a
//! transfer is entirely encoded in the account streams.
//!
//! ```text
//! MoneyTransferred(A) → AccountDebited(A) ─┬→ MoneyTransferred(B) → AccountCredited(B)
//!                                          │     → MoneyTransferSucceeded(A) + (B)
//!                                          └→ (balance too low) MoneyTransferCancelled(A)
//! ```
//!
//! ## Ordering
//!
//! Follow-ups are processed FIFO on the caller's thread, and every step runs
//! under the per-account lock of the one account it writes. A step never holds
//! two locks, so transfers in opposite directions cannot deadlock.

mod transfer;

use std::collections::VecDeque;

use tracing::{Span, debug, debug_span};

use ledger_accounts::AccountEvent;
use ledger_core::AccountId;
use ledger_events::Event;

use crate::error::LedgerError;
use crate::event_store::EventStore;
use crate::locks::KeyedLocks;
use crate::repository::AccountRepository;

pub struct SagaOrchestrator<S> {
    store: S,
    accounts: AccountRepository<S>,
    locks: KeyedLocks<AccountId>,
}

impl<S> SagaOrchestrator<S>
where
    S: EventStore<AccountEvent> + Clone,
{
    pub fn new(store: S) -> Self {
        Self {
            accounts: AccountRepository::new(store.clone()),
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Drive `initial` and every event it causes until the chain is exhausted.
    ///
    /// Returns once each touched account has reached a terminal event for the
    /// transfer, or with the first fatal error. An `Err` aborts the remaining
    /// chain; already persisted steps stay persisted.
    pub fn dispatch(&self, initial: AccountEvent) -> Result<(), LedgerError> {
        let mut queue = VecDeque::from([initial]);

        while let Some(event) = queue.pop_front() {
            let span = step_span(&event);
            let _entered = span.enter();
            debug!("handling event");

            let follow_ups = self.handle(&event)?;
            queue.extend(follow_ups);
        }

        Ok(())
    }

    fn handle(&self, event: &AccountEvent) -> Result<Vec<AccountEvent>, LedgerError> {
        match event {
            AccountEvent::AccountCreated(e) => self.on_created(e),
            AccountEvent::MoneyTransferred(e) => self.on_transferred(e),
            AccountEvent::AccountDebited(e) => self.on_debited(e),
            AccountEvent::AccountCredited(e) => self.on_credited(e),
            AccountEvent::MoneyTransferSucceeded(e) => self.on_succeeded(e),
            AccountEvent::MoneyTransferCancelled(e) => self.on_cancelled(e),
        }
    }
}

fn step_span(event: &AccountEvent) -> Span {
    let span = debug_span!(
        "saga_step",
        event_type = event.event_type(),
        aggregate_id = %event.aggregate_id(),
        transaction_id = tracing::field::Empty,
    );
    if let Some(transfer) = event.transfer() {
        span.record("transaction_id", tracing::field::display(transfer.transaction_id));
    }
    span
}
