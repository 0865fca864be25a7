//! Intrabank Transfer Library
//! # Overview
//!
//! Account balances, mini statements and two-party money transfers over a
//! pluggable ledger store, plus CSV batch processing with a sync and an
//! async strategy.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, Transaction, TransferRequest, ...)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Balance and statement queries, transfer algorithm
//!   - [`core::traits`] - The `LedgerStore` persistence contract
//!   - [`core::account_locks`] - Per-account serialization of transfers
//!   - [`core::memory_store`] - In-memory store and the 111/222 fixture
//! - [`io`] - CSV formats, the durable CSV store and batch readers
//! - [`strategy`] - Sync and async batch transfer pipelines
//! - [`logging`] - tracing subscriber setup
//!
//! # Transfers
//!
//! A transfer names a destination account (`to`) and a request carrying the
//! source account, amount and type:
//!
//! - **Debit**: `to` balance decreases, `from` balance increases
//! - **Credit**: `to` balance increases, `from` balance decreases
//!
//! The destination balance must strictly exceed the amount for either
//! type, no balance may end negative, and the transaction is recorded on
//! the destination account only.
//!
//! ```
//! use intrabank_transfer::{MemoryLedgerStore, TransactionType, TransferEngine, TransferRequest};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! let engine = TransferEngine::new(Arc::new(MemoryLedgerStore::fixture()));
//! let request = TransferRequest::new(222, Decimal::ONE, TransactionType::Debit).unwrap();
//! engine.transfer(111, &request).unwrap();
//!
//! assert_eq!(engine.get_balance(111).unwrap().balance, Decimal::new(900, 2));
//! assert_eq!(engine.get_mini_statement(111).unwrap().len(), 3);
//! ```

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use core::{AccountLocks, LedgerStore, MemoryLedgerStore, TransferEngine};
pub use io::{write_balances_csv, CsvLedgerStore};
pub use strategy::{create_strategy, BatchSummary, ProcessingStrategy};
pub use types::{
    Account, AccountId, BalanceDetails, CurrencyCode, LedgerError, StatementEntry, Transaction,
    TransactionId, TransactionType, TransferRecord, TransferRequest,
};
