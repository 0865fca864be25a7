//! Intrabank Transfer CLI
//!
//! # Usage
//!
//! ```bash
//! intrabank-transfer --fixture balance 111
//! intrabank-transfer --ledger-dir ./ledger statement 111
//! intrabank-transfer --ledger-dir ./ledger transfer --to 111 --from 222 --amount 1.50 --type debit
//! intrabank-transfer --ledger-dir ./ledger batch --strategy async --batch-size 500 transfers.csv > balances.csv
//! ```
//!
//! `--ledger-dir` may also come from `INTRABANK_LEDGER_DIR`; `--fixture`
//! takes precedence over the variable. Query results
//! are printed to stdout as JSON, batch results as CSV; logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (unknown account, rejected transfer, unreadable ledger, etc.)

use intrabank_transfer::cli::{self, CliArgs, Command, LedgerSource};
use intrabank_transfer::{
    logging, strategy, CsvLedgerStore, LedgerError, LedgerStore, MemoryLedgerStore,
    TransferEngine, TransferRequest,
};
use serde::Serialize;
use std::io::Write;
use std::process;
use std::sync::Arc;

fn main() {
    let (args, source) = cli::parse_args();
    logging::init(&args.log_level);

    if let Err(e) = run(args, &source) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn open_store(source: &LedgerSource) -> Result<Arc<dyn LedgerStore>, LedgerError> {
    match source {
        LedgerSource::Directory(dir) => Ok(Arc::new(CsvLedgerStore::open(dir)?)),
        LedgerSource::Fixture => Ok(Arc::new(MemoryLedgerStore::fixture())),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LedgerError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(|e| LedgerError::IoError {
        message: e.to_string(),
    })?;
    writeln!(stdout)?;
    Ok(())
}

fn run(args: CliArgs, source: &LedgerSource) -> Result<(), LedgerError> {
    let engine = Arc::new(TransferEngine::new(open_store(source)?));

    match args.command {
        Command::Balance { account_id } => print_json(&engine.get_balance(account_id)?),
        Command::Statement { account_id } => print_json(&engine.get_mini_statement(account_id)?),
        Command::Transfer(transfer) => {
            let mut request =
                TransferRequest::new(transfer.from_account_id, transfer.amount, transfer.tx_type)?;
            if let Some(date) = transfer.date {
                request = request.at(date);
            }
            engine.transfer(transfer.to_account_id, &request)
        }
        Command::Batch(batch) => {
            let config = match batch.strategy {
                cli::StrategyType::Async => Some(batch.to_batch_config()),
                cli::StrategyType::Sync => None,
            };
            let strategy = strategy::create_strategy(batch.strategy, config);

            let mut output = std::io::stdout();
            let summary = strategy.process(&engine, &batch.input_file, &mut output)?;
            eprintln!(
                "{} applied, {} rejected, {} malformed",
                summary.applied, summary.rejected, summary.malformed
            );
            Ok(())
        }
    }
}
