//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account aggregate, currency code, balance view
//! - `transaction`: Transaction records, transfer requests, statement view
//! - `error`: Error types for the ledger

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountId, BalanceDetails, CurrencyCode};
pub use error::LedgerError;
pub use transaction::{
    StatementEntry, Transaction, TransactionId, TransactionType, TransferRecord, TransferRequest,
};
