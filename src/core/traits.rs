//! Core traits for ledger persistence
//!
//! The transfer engine only ever talks to storage through [`LedgerStore`].
//! Two implementations ship with the crate: the deterministic in-memory
//! [`MemoryLedgerStore`](crate::core::MemoryLedgerStore) and the durable
//! CSV-backed [`CsvLedgerStore`](crate::io::CsvLedgerStore). Callers pick one
//! explicitly and hand it to the engine.

use crate::types::{Account, AccountId, LedgerError};

/// Durable keyed storage of accounts and the transactions they own
///
/// Implementations must be safe to share between threads.
pub trait LedgerStore: Send + Sync {
    /// Load an account, with its full transaction history, by id
    ///
    /// Returns `Ok(None)` when no account exists for `account_id`.
    fn find_by_id(&self, account_id: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Upsert an account and return the committed copy
    ///
    /// The store assigns ids to transactions that do not have one yet and
    /// bumps the account version. An account whose version no longer matches
    /// the stored one is rejected with `ConcurrentModification`.
    fn save(&self, account: Account) -> Result<Account, LedgerError>;

    /// Persist both sides of a transfer
    ///
    /// The default performs two independent commits, destination first. A
    /// failure of the second commit leaves the first one in place. Stores
    /// that can commit several keys at once should override this.
    fn commit_transfer(&self, to: Account, from: Account) -> Result<(), LedgerError> {
        self.save(to)?;
        self.save(from)?;
        Ok(())
    }
}
