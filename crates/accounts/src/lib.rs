//! Accounts domain module (event-sourced).
//!
//! Balance and transaction-state rules for bank accounts, implemented purely as
//! deterministic domain logic (no IO, no locking, no storage).

pub mod account;
pub mod events;
pub mod transaction;

pub use account::{Account, DebitOutcome, INITIAL_BALANCE_MINOR};
pub use events::{
    AccountCreated, AccountCredited, AccountDebited, AccountEvent, CancelReason,
    MoneyTransferCancelled, MoneyTransferSucceeded, MoneyTransferred, TransferDetails,
};
pub use transaction::{Transaction, TransactionKind, TransactionState};
