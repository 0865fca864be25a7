//! In-memory ledger store
//!
//! This module provides the `MemoryLedgerStore`, a thread-safe `LedgerStore`
//! backed by `DashMap`. It is the deterministic fixture used by tests and by
//! the CLI's `--fixture` mode.
//!
//! # Thread Safety
//!
//! Each save runs its version check and write under the account's `DashMap`
//! entry lock, so a stale copy can never overwrite a newer one.

use crate::core::traits::LedgerStore;
use crate::types::{
    Account, AccountId, CurrencyCode, LedgerError, Transaction, TransactionType,
};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe in-memory ledger
#[derive(Debug)]
pub struct MemoryLedgerStore {
    accounts: DashMap<AccountId, Account>,
    next_transaction_id: AtomicU64,
}

impl MemoryLedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            next_transaction_id: AtomicU64::new(1),
        }
    }

    /// Create a store pre-loaded with `accounts`
    ///
    /// Unsaved transactions on the seeded accounts receive ids in iteration
    /// order. Seeded accounts start at version 1.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        for mut account in accounts {
            store.stamp(&mut account);
            store.accounts.insert(account.account_id(), account);
        }
        store
    }

    /// The deterministic demo ledger
    ///
    /// - account 111: 10.00 NOK, two DEBIT records from account 222 (1.00 and 10.00)
    /// - account 222: 10.00 NOK, no records
    pub fn fixture() -> Self {
        let nok = CurrencyCode::NOK;
        // 2024-01-15T09:30:00Z and 2024-01-16T14:00:00Z
        let first = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(1_705_311_000);
        let second = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(1_705_413_600);

        let transactions = vec![
            Transaction::new(222, Decimal::new(100, 2), TransactionType::Debit, first),
            Transaction::new(222, Decimal::new(1000, 2), TransactionType::Debit, second),
        ];

        Self::with_accounts([
            Account::new(111, Decimal::new(1000, 2), nok).with_transactions(transactions),
            Account::new(222, Decimal::new(1000, 2), nok),
        ])
    }

    fn stamp(&self, account: &mut Account) {
        account.assign_transaction_ids(|| self.next_transaction_id.fetch_add(1, Ordering::SeqCst));
        account.set_version(account.version() + 1);
    }

    /// Snapshot of every account, sorted by id
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(Account::account_id);
        accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn find_by_id(&self, account_id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self
            .accounts
            .get(&account_id)
            .map(|entry| entry.value().clone()))
    }

    fn save(&self, mut account: Account) -> Result<Account, LedgerError> {
        match self.accounts.entry(account.account_id()) {
            Entry::Occupied(mut occupied) => {
                let found = occupied.get().version();
                if found != account.version() {
                    return Err(LedgerError::concurrent_modification(
                        account.account_id(),
                        account.version(),
                        found,
                    ));
                }
                self.stamp(&mut account);
                occupied.insert(account.clone());
            }
            Entry::Vacant(vacant) => {
                self.stamp(&mut account);
                vacant.insert(account.clone());
            }
        }
        Ok(account)
    }
}
