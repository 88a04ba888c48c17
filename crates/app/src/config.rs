//! Environment-driven configuration of the demo binary.

use anyhow::Context;

use ledger_core::Money;
use ledger_observability::LogFormat;

pub const LOG_FORMAT_VAR: &str = "LEDGER_LOG_FORMAT";
pub const TRANSFERS_VAR: &str = "LEDGER_DEMO_TRANSFERS";
pub const AMOUNT_VAR: &str = "LEDGER_DEMO_AMOUNT";

const DEFAULT_TRANSFERS: usize = 500;
const DEFAULT_AMOUNT_MINOR: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_format: LogFormat,
    /// Number of concurrent transfers from the first to the second account.
    pub transfers: usize,
    pub amount: Money,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            transfers: DEFAULT_TRANSFERS,
            amount: Money::from_minor(DEFAULT_AMOUNT_MINOR),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let log_format = match lookup(LOG_FORMAT_VAR) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .with_context(|| format!("invalid {LOG_FORMAT_VAR}"))?,
            None => defaults.log_format,
        };

        let transfers = match lookup(TRANSFERS_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid {TRANSFERS_VAR}: '{raw}'"))?,
            None => defaults.transfers,
        };

        let amount = match lookup(AMOUNT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<Money>()
                .with_context(|| format!("invalid {AMOUNT_VAR}: '{raw}'"))?,
            None => defaults.amount,
        };
        if !amount.is_positive() {
            anyhow::bail!("{AMOUNT_VAR} must be positive, got {amount}");
        }

        Ok(Self {
            log_format,
            transfers,
            amount,
        })
    }
}
