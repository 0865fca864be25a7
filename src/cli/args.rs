use crate::strategy::BatchConfig;
use crate::types::{AccountId, TransactionType};
use chrono::{DateTime, Utc};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable naming the ledger directory
pub const LEDGER_DIR_ENV: &str = "INTRABANK_LEDGER_DIR";

/// Query balances and move money between bank accounts
#[derive(Parser, Debug)]
#[command(name = "intrabank-transfer")]
#[command(about = "Query balances and move money between bank accounts", long_about = None)]
#[command(group(ArgGroup::new("store").args(["ledger_dir", "fixture"])))]
pub struct CliArgs {
    /// Directory holding accounts.csv and transactions.csv
    /// [env: INTRABANK_LEDGER_DIR]
    #[arg(long = "ledger-dir", value_name = "DIR")]
    pub ledger_dir: Option<PathBuf>,

    /// Use the built-in in-memory fixture ledger (accounts 111 and 222);
    /// takes precedence over INTRABANK_LEDGER_DIR
    #[arg(long)]
    pub fixture: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print an account's balance as JSON
    Balance {
        #[arg(value_name = "ACCOUNT")]
        account_id: AccountId,
    },
    /// Print an account's mini statement as JSON
    Statement {
        #[arg(value_name = "ACCOUNT")]
        account_id: AccountId,
    },
    /// Move money between two accounts
    Transfer(TransferArgs),
    /// Apply a CSV file of transfers and print the touched balances
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Account the transaction is recorded on
    #[arg(long = "to", value_name = "ACCOUNT")]
    pub to_account_id: AccountId,

    /// Counterparty account
    #[arg(long = "from", value_name = "ACCOUNT")]
    pub from_account_id: AccountId,

    #[arg(long, value_name = "AMOUNT", allow_negative_numbers = true)]
    pub amount: Decimal,

    /// DEBIT or CREDIT (case-insensitive)
    #[arg(long = "type", value_name = "TYPE")]
    pub tx_type: TransactionType,

    /// RFC 3339 timestamp; defaults to now
    #[arg(long, value_name = "TIMESTAMP")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Transfer CSV: to_account,from_account,amount,type[,transaction_date]
    #[arg(value_name = "INPUT")]
    pub input_file: PathBuf,

    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' for in-order or 'async' for partitioned parallel"
    )]
    pub strategy: StrategyType,

    /// Number of transfers per batch (async mode only)
    #[arg(long = "batch-size", value_name = "SIZE")]
    pub batch_size: Option<usize>,

    /// Worker threads (async mode only, default: CPU cores)
    #[arg(long = "max-concurrent", value_name = "COUNT")]
    pub max_concurrent_batches: Option<usize>,
}

/// Where the ledger comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerSource {
    Fixture,
    Directory(PathBuf),
}

impl CliArgs {
    /// Resolve the ledger from the flags and `INTRABANK_LEDGER_DIR`
    pub fn ledger_source(&self) -> Option<LedgerSource> {
        self.ledger_source_with(std::env::var_os(LEDGER_DIR_ENV))
    }

    /// `--fixture` wins, then `--ledger-dir`, then a non-empty `env_dir`
    pub fn ledger_source_with(&self, env_dir: Option<OsString>) -> Option<LedgerSource> {
        if self.fixture {
            return Some(LedgerSource::Fixture);
        }
        self.ledger_dir
            .clone()
            .or_else(|| env_dir.filter(|dir| !dir.is_empty()).map(PathBuf::from))
            .map(LedgerSource::Directory)
    }
}

/// Available batch processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl BatchArgs {
    /// Build a BatchConfig from the optional overrides
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_none() && self.max_concurrent_batches.is_none() {
            return BatchConfig::default();
        }

        let default = BatchConfig::default();
        BatchConfig::new(
            self.batch_size.unwrap_or(default.batch_size),
            self.max_concurrent_batches
                .unwrap_or(default.max_concurrent_batches),
        )
    }
}
