//! Object graph of a running ledger.

use std::sync::Arc;

use ledger_accounts::AccountEvent;

use crate::command_service::CommandService;
use crate::event_store::{EventStore, InMemoryEventStore};
use crate::repository::AccountRepository;

/// Shared store handle used by [`Ledger::in_memory`].
pub type InMemoryStore = Arc<InMemoryEventStore<AccountEvent>>;

/// Commands and queries over one event store, built once at startup and
/// shared by reference (it is `Sync` whenever the store is).
pub struct Ledger<S> {
    commands: CommandService<S>,
    accounts: AccountRepository<S>,
}

impl Ledger<InMemoryStore> {
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryEventStore::new()))
    }
}

impl<S> Ledger<S>
where
    S: EventStore<AccountEvent> + Clone,
{
    pub fn new(store: S) -> Self {
        Self {
            commands: CommandService::new(store.clone()),
            accounts: AccountRepository::new(store),
        }
    }

    pub fn commands(&self) -> &CommandService<S> {
        &self.commands
    }

    pub fn accounts(&self) -> &AccountRepository<S> {
        &self.accounts
    }
}
