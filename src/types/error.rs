//! Error types for the intra-bank transfer ledger
//!
//! This module defines every error that can surface from the transfer engine,
//! the ledger stores, and the CSV boundary.
//!
//! # Error Categories
//!
//! - **Lookup Errors**: an account id that does not resolve
//! - **Transfer Errors**: insufficient funds, self transfers, invalid amounts
//! - **Boundary Errors**: unknown transaction types, malformed currency codes
//! - **Store Errors**: optimistic-concurrency conflicts, file I/O, CSV parsing
//! - **Batch Errors**: a worker task that failed mid-batch

use super::account::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the ledger
///
/// Every variant is reported synchronously to the caller; nothing here is
/// retried by the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// No account exists for the given id
    ///
    /// Raised for either side of a transfer and for both queries.
    #[error("Invalid Account ID {account_id}")]
    AccountNotFound {
        /// The id that did not resolve
        account_id: AccountId,
    },

    /// The funds check rejected the transfer
    ///
    /// No account has been mutated when this is returned.
    #[error(
        "Insufficient funds available for account {account_id}: balance {balance}, requested {requested}"
    )]
    InsufficientFunds {
        /// Account whose balance failed the check
        account_id: AccountId,
        /// Balance at the time of the check
        balance: Decimal,
        /// Requested transfer amount
        requested: Decimal,
    },

    /// Transaction type is neither DEBIT nor CREDIT
    #[error("Not a valid transaction type: '{tx_type}'")]
    InvalidTransactionType {
        /// The rejected type string
        tx_type: String,
    },

    /// Amount is negative or not a decimal number
    #[error("Invalid amount '{amount}'")]
    InvalidAmount {
        /// The rejected amount, as given
        amount: String,
    },

    /// Currency code is not three ASCII letters
    #[error("Invalid currency code '{code}'")]
    InvalidCurrency {
        /// The rejected code
        code: String,
    },

    /// Source and destination are the same account
    #[error("Cannot transfer from account {account_id} to itself")]
    SelfTransfer {
        /// The account named on both sides
        account_id: AccountId,
    },

    /// Decimal arithmetic overflowed while computing a new balance
    #[error("Arithmetic overflow in {operation} for account {account_id}")]
    ArithmeticOverflow {
        /// Operation that overflowed
        operation: String,
        /// Account being updated
        account_id: AccountId,
    },

    /// The stored account changed since it was loaded
    #[error(
        "Account {account_id} was modified concurrently: expected version {expected}, found {found}"
    )]
    ConcurrentModification {
        /// Account being saved
        account_id: AccountId,
        /// Version carried by the caller's copy
        expected: u64,
        /// Version currently in the store
        found: u64,
    },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing ledger files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// A batch worker task died before reporting its results
    #[error("Batch worker failed: {message}")]
    WorkerFailed {
        /// Why the task did not complete
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Create an AccountNotFound error
    pub fn account_not_found(account_id: AccountId) -> Self {
        LedgerError::AccountNotFound { account_id }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account_id: AccountId, balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account_id,
            balance,
            requested,
        }
    }

    /// Create an InvalidTransactionType error
    pub fn invalid_transaction_type(tx_type: &str) -> Self {
        LedgerError::InvalidTransactionType {
            tx_type: tx_type.to_string(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: impl ToString) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.to_string(),
        }
    }

    /// Create an InvalidCurrency error
    pub fn invalid_currency(code: &str) -> Self {
        LedgerError::InvalidCurrency {
            code: code.to_string(),
        }
    }

    /// Create a SelfTransfer error
    pub fn self_transfer(account_id: AccountId) -> Self {
        LedgerError::SelfTransfer { account_id }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account_id: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account_id,
        }
    }

    /// Create a ConcurrentModification error
    pub fn concurrent_modification(account_id: AccountId, expected: u64, found: u64) -> Self {
        LedgerError::ConcurrentModification {
            account_id,
            expected,
            found,
        }
    }

    /// Map a failure to open `path` onto `FileNotFound` or `IoError`
    pub fn open_failed(path: &std::path::Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            LedgerError::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            LedgerError::IoError {
                message: format!("failed to open '{}': {}", path.display(), error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal::Decimal;

    #[test]
    fn test_open_failed_maps_not_found() {
        let path = std::path::Path::new("missing.csv");
        let not_found = std::io::Error::from(std::io::ErrorKind::NotFound);
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);

        assert_eq!(
            LedgerError::open_failed(path, not_found),
            LedgerError::FileNotFound {
                path: "missing.csv".to_string()
            }
        );
        assert!(matches!(
            LedgerError::open_failed(path, denied),
            LedgerError::IoError { .. }
        ));
    }

    #[rstest]
    #[case::account_not_found(
        LedgerError::AccountNotFound { account_id: 111 },
        "Invalid Account ID 111"
    )]
    #[case::insufficient_funds(
        LedgerError::InsufficientFunds { account_id: 111, balance: Decimal::new(1000, 2), requested: Decimal::new(2000, 2) },
        "Insufficient funds available for account 111: balance 10.00, requested 20.00"
    )]
    #[case::invalid_transaction_type(
        LedgerError::InvalidTransactionType { tx_type: "REFUND".to_string() },
        "Not a valid transaction type: 'REFUND'"
    )]
    #[case::invalid_amount(
        LedgerError::InvalidAmount { amount: "-1".to_string() },
        "Invalid amount '-1'"
    )]
    #[case::self_transfer(
        LedgerError::SelfTransfer { account_id: 7 },
        "Cannot transfer from account 7 to itself"
    )]
    #[case::concurrent_modification(
        LedgerError::ConcurrentModification { account_id: 7, expected: 1, found: 2 },
        "Account 7 was modified concurrently: expected version 1, found 2"
    )]
    #[case::worker_failed(
        LedgerError::WorkerFailed { message: "task panicked".to_string() },
        "Batch worker failed: task panicked"
    )]
    #[case::parse_error_with_line(
        LedgerError::ParseError { line: Some(42), message: "Invalid field".to_string() },
        "CSV parse error at line 42: Invalid field"
    )]
    #[case::parse_error_without_line(
        LedgerError::ParseError { line: None, message: "Invalid field".to_string() },
        "CSV parse error: Invalid field"
    )]
    fn test_error_display(#[case] error: LedgerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::account_not_found(
        LedgerError::account_not_found(222),
        LedgerError::AccountNotFound { account_id: 222 }
    )]
    #[case::insufficient_funds(
        LedgerError::insufficient_funds(1, Decimal::TEN, Decimal::ONE_HUNDRED),
        LedgerError::InsufficientFunds { account_id: 1, balance: Decimal::TEN, requested: Decimal::ONE_HUNDRED }
    )]
    #[case::invalid_transaction_type(
        LedgerError::invalid_transaction_type("refund"),
        LedgerError::InvalidTransactionType { tx_type: "refund".to_string() }
    )]
    #[case::arithmetic_overflow(
        LedgerError::arithmetic_overflow("transfer", 3),
        LedgerError::ArithmeticOverflow { operation: "transfer".to_string(), account_id: 3 }
    )]
    fn test_helper_functions(#[case] result: LedgerError, #[case] expected: LedgerError) {
        assert_eq!(result, expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: LedgerError = io_error.into();
        assert!(matches!(error, LedgerError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }
}
