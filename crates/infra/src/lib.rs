//! Infrastructure layer: event store, per-account serialization, transfer saga
//! and the command/query surface of the ledger.

pub mod command_service;
pub mod error;
pub mod event_store;
pub mod ledger;
pub mod locks;
pub mod repository;
pub mod saga;


pub use command_service::CommandService;
pub use error::LedgerError;
pub use ledger::{InMemoryStore, Ledger};
pub use repository::AccountRepository;
pub use saga::SagaOrchestrator;
