//! Demo entry point: opens two accounts, runs concurrent transfers between
//! them and prints the resulting accounts as JSON.

mod config;

use anyhow::{Context, anyhow};
use serde::Serialize;

use ledger_accounts::{Account, TransactionState};
use ledger_core::AccountId;
use ledger_infra::Ledger;

use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DemoReport {
    issuer: AccountId,
    receiver: AccountId,
    succeeded: usize,
    cancelled: usize,
    accounts: Vec<Account>,
}

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    ledger_observability::init(config.log_format);

    tracing::info!(
        transfers = config.transfers,
        amount = %config.amount,
        "starting ledger demo"
    );

    let ledger = Ledger::in_memory();
    let commands = ledger.commands();
    let issuer = commands.create_account("Demo Issuer")?;
    let receiver = commands.create_account("Demo Receiver")?;

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..config.transfers)
            .map(|_| s.spawn(|| commands.transfer_money(issuer, receiver, config.amount)))
            .collect();

        handles
            .into_iter()
            .try_for_each(|handle| -> anyhow::Result<()> {
                handle
                    .join()
                    .map_err(|_| anyhow!("transfer thread panicked"))?
                    .context("transfer failed")?;
                Ok(())
            })
    })?;

    let issuer_account = ledger.accounts().get(issuer)?;
    let count = |state: TransactionState| {
        issuer_account
            .transactions()
            .values()
            .filter(|tx| tx.state == state)
            .count()
    };

    let report = DemoReport {
        issuer,
        receiver,
        succeeded: count(TransactionState::Succeeded),
        cancelled: count(TransactionState::Cancelled),
        accounts: ledger.accounts().find_all()?,
    };

    tracing::info!(
        succeeded = report.succeeded,
        cancelled = report.cancelled,
        "ledger demo finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
