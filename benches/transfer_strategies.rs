//! Benchmark suite comparing the batch strategies
//!
//! ```bash
//! cargo bench
//! ```
//!
//! Each run applies a generated batch of debit transfers over 100
//! in-memory accounts. Rows are spread over many account pairs, so the
//! async strategy gets several independent groups per batch.

use intrabank_transfer::cli::StrategyType;
use intrabank_transfer::strategy::{create_strategy, BatchConfig};
use intrabank_transfer::{Account, CurrencyCode, MemoryLedgerStore, TransferEngine};
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const ACCOUNTS: u32 = 100;

fn main() {
    divan::main();
}

fn transfer_file(rows: u32) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "to_account,from_account,amount,type,transaction_date").unwrap();
    for i in 0..rows {
        let to = i % ACCOUNTS;
        let from = (to + 1 + i % 7) % ACCOUNTS;
        writeln!(file, "{},{},0.01,debit,", to, from).unwrap();
    }
    file.flush().unwrap();
    file
}

fn engine() -> Arc<TransferEngine> {
    let accounts = (0..ACCOUNTS)
        .map(|id| Account::new(id, Decimal::new(1_000_000, 0), CurrencyCode::NOK));
    Arc::new(TransferEngine::new(Arc::new(
        MemoryLedgerStore::with_accounts(accounts),
    )))
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn sync_strategy(bencher: divan::Bencher, rows: u32) {
    let file = transfer_file(rows);
    let strategy = create_strategy(StrategyType::Sync, None);

    bencher.with_inputs(engine).bench_values(|engine| {
        strategy
            .process(&engine, file.path(), &mut Vec::new())
            .expect("Processing failed")
    });
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn async_strategy(bencher: divan::Bencher, rows: u32) {
    let file = transfer_file(rows);
    let strategy = create_strategy(StrategyType::Async, Some(BatchConfig::default()));

    bencher.with_inputs(engine).bench_values(|engine| {
        strategy
            .process(&engine, file.path(), &mut Vec::new())
            .expect("Processing failed")
    });
}
