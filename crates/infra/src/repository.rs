//! Query surface over account streams.
//!
//! Accounts are never cached: every read replays the account's stream from
//! scratch.

use ledger_accounts::{Account, AccountEvent};
use ledger_core::{AccountId, replay};
use ledger_events::EventEnvelope;

use crate::error::LedgerError;
use crate::event_store::EventStore;

#[derive(Debug, Clone)]
pub struct AccountRepository<S> {
    store: S,
}

impl<S> AccountRepository<S>
where
    S: EventStore<AccountEvent>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn exists(&self, id: AccountId) -> Result<bool, LedgerError> {
        Ok(self.store.exists(id)?)
    }

    /// Rebuild the account, or `AccountNotFound` when it has no stream.
    pub fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.load(id)?.ok_or(LedgerError::AccountNotFound(id))
    }

    /// Every account, in creation order (one replay per stream).
    pub fn find_all(&self) -> Result<Vec<Account>, LedgerError> {
        self.store
            .stream_ids()?
            .into_iter()
            .map(|id| self.get(id))
            .collect()
    }

    /// Stored events of an account, in append order.
    pub fn history(&self, id: AccountId) -> Result<Vec<EventEnvelope<AccountEvent>>, LedgerError> {
        let stream = self.store.load_stream(id)?;
        if stream.is_empty() {
            return Err(LedgerError::AccountNotFound(id));
        }
        Ok(stream)
    }

    /// Replay the account's stream; `None` when nothing was ever appended.
    pub(crate) fn load(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        let stream = self.store.load_stream(id)?;
        if stream.is_empty() {
            return Ok(None);
        }
        let account: Account = replay(stream.iter().map(EventEnvelope::payload))?;
        Ok(Some(account))
    }
}
