//! Durable CSV-backed ledger store
//!
//! The ledger lives in a directory holding two files:
//! - `accounts.csv` - `account_id,balance,currency,version`
//! - `transactions.csv` - `transaction_id,owner_account_id,account_id,amount,type,transaction_date`
//!
//! `accounts.csv` must exist; accounts are provisioned by editing it (or via
//! [`CsvLedgerStore::create`]). `transactions.csv` is created on first write.
//!
//! # Durability
//!
//! The whole ledger is held in memory behind one mutex. Every commit builds
//! the next snapshot, appends the transactions it created to
//! `transactions.csv`, rewrites `accounts.csv` through a temporary sibling
//! and a rename, and only then publishes the snapshot in memory. If the
//! accounts write fails, `transactions.csv` is truncated back to its
//! previous length, so a failed commit leaves both files and the in-memory
//! state as they were.
//!
//! # Cost
//!
//! A commit writes its own transaction rows plus one full copy of
//! `accounts.csv`, so its cost grows with the number of accounts but not
//! with the history. Commits are serialized by the store mutex: parallel
//! batch groups contend here even when their accounts are disjoint.

use crate::core::LedgerStore;
use crate::io::csv_format::{
    account_from_row, account_to_row, transaction_from_row, transaction_to_row, AccountRow,
    TransactionRow,
};
use crate::types::{Account, AccountId, LedgerError, Transaction, TransactionId};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

pub const ACCOUNTS_FILE: &str = "accounts.csv";
pub const TRANSACTIONS_FILE: &str = "transactions.csv";

#[derive(Debug, Clone)]
struct Snapshot {
    accounts: BTreeMap<AccountId, Account>,
    next_transaction_id: TransactionId,
}

impl Snapshot {
    /// Version-check `account` against this snapshot and write it in
    ///
    /// Transactions without an id get the next free ids; their rows are
    /// pushed onto `created`. Transactions that already carry an id are
    /// taken as persisted.
    fn stage(
        &mut self,
        mut account: Account,
        created: &mut Vec<TransactionRow>,
    ) -> Result<Account, LedgerError> {
        let account_id = account.account_id();
        if let Some(current) = self.accounts.get(&account_id) {
            if current.version() != account.version() {
                return Err(LedgerError::concurrent_modification(
                    account_id,
                    account.version(),
                    current.version(),
                ));
            }
        }

        let fresh: Vec<usize> = account
            .transactions()
            .iter()
            .enumerate()
            .filter(|(_, tx)| tx.transaction_id().is_none())
            .map(|(index, _)| index)
            .collect();
        let next_free = self
            .next_transaction_id
            .checked_add(fresh.len() as u64)
            .ok_or_else(|| LedgerError::arithmetic_overflow("transaction id", account_id))?;
        let version = account
            .version()
            .checked_add(1)
            .ok_or_else(|| LedgerError::arithmetic_overflow("version", account_id))?;

        let mut next = self.next_transaction_id;
        account.assign_transaction_ids(|| {
            let id = next;
            next += 1;
            id
        });
        self.next_transaction_id = next_free;
        account.set_version(version);

        created.extend(
            fresh
                .iter()
                .filter_map(|&index| transaction_to_row(&account.transactions()[index])),
        );
        self.accounts.insert(account_id, account.clone());
        Ok(account)
    }
}

/// `LedgerStore` persisted as CSV files in a directory
#[derive(Debug)]
pub struct CsvLedgerStore {
    dir: PathBuf,
    state: Mutex<Snapshot>,
}

impl CsvLedgerStore {
    /// Open an existing ledger directory
    ///
    /// # Errors
    ///
    /// - `FileNotFound` if `accounts.csv` is missing
    /// - `ParseError` / `InvalidAmount` / `InvalidCurrency` for malformed rows,
    ///   negative balances, duplicate account or transaction ids,
    ///   transactions owned by unknown accounts, or a transaction id too
    ///   large to leave room for new ones
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let dir = dir.as_ref().to_path_buf();
        let accounts_path = dir.join(ACCOUNTS_FILE);
        if !accounts_path.exists() {
            return Err(LedgerError::FileNotFound {
                path: accounts_path.display().to_string(),
            });
        }

        let transactions_path = dir.join(TRANSACTIONS_FILE);
        let mut owned: HashMap<AccountId, Vec<Transaction>> = HashMap::new();
        let mut max_transaction_id = 0;
        let mut seen_ids = HashSet::new();
        if transactions_path.exists() {
            for row in read_rows::<TransactionRow>(&transactions_path)? {
                if !seen_ids.insert(row.transaction_id) {
                    return Err(LedgerError::ParseError {
                        line: None,
                        message: format!("duplicate transaction id {}", row.transaction_id),
                    });
                }
                max_transaction_id = max_transaction_id.max(row.transaction_id);
                owned
                    .entry(row.owner_account_id)
                    .or_default()
                    .push(transaction_from_row(&row)?);
            }
        }

        let mut accounts = BTreeMap::new();
        for row in read_rows::<AccountRow>(&accounts_path)? {
            let transactions = owned.remove(&row.account_id).unwrap_or_default();
            let account = account_from_row(&row, transactions)?;
            if accounts.insert(row.account_id, account).is_some() {
                return Err(LedgerError::ParseError {
                    line: None,
                    message: format!("duplicate account id {}", row.account_id),
                });
            }
        }

        if let Some(orphan) = owned.keys().min() {
            return Err(LedgerError::ParseError {
                line: None,
                message: format!("transactions reference unknown account {}", orphan),
            });
        }

        let next_transaction_id = max_transaction_id.checked_add(1).ok_or_else(|| {
            LedgerError::ParseError {
                line: None,
                message: format!(
                    "transaction id {} leaves no room for new transactions",
                    max_transaction_id
                ),
            }
        })?;

        info!(
            dir = %dir.display(),
            accounts = accounts.len(),
            transactions = seen_ids.len(),
            "opened CSV ledger"
        );

        Ok(Self {
            dir,
            state: Mutex::new(Snapshot {
                accounts,
                next_transaction_id,
            }),
        })
    }

    /// Provision a new ledger directory holding `accounts`
    ///
    /// Existing ledger files in `dir` are replaced.
    pub fn create(
        dir: impl AsRef<Path>,
        accounts: impl IntoIterator<Item = Account>,
    ) -> Result<Self, LedgerError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut snapshot = Snapshot {
            accounts: BTreeMap::new(),
            next_transaction_id: 1,
        };
        let mut created = Vec::new();
        for account in accounts {
            snapshot.stage(account, &mut created)?;
        }

        replace_file(&dir.join(TRANSACTIONS_FILE), &created)?;
        replace_file(&dir.join(ACCOUNTS_FILE), &account_rows(&snapshot))?;

        Ok(Self {
            dir,
            state: Mutex::new(snapshot),
        })
    }

    /// Snapshot of every account, sorted by id
    pub fn accounts(&self) -> Vec<Account> {
        self.lock().accounts.values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        // Snapshots are only published after a successful write.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stage `accounts` on a copy of the current snapshot, persist, then publish
    fn commit(&self, accounts: Vec<Account>) -> Result<Vec<Account>, LedgerError> {
        let mut state = self.lock();
        let mut next = state.clone();

        let mut created = Vec::new();
        let saved = accounts
            .into_iter()
            .map(|account| next.stage(account, &mut created))
            .collect::<Result<Vec<_>, _>>()?;

        self.persist(&next, &created)?;
        *state = next;
        Ok(saved)
    }

    /// Append `created` to the transaction log and rewrite the accounts file
    fn persist(
        &self,
        snapshot: &Snapshot,
        created: &[TransactionRow],
    ) -> Result<(), LedgerError> {
        let transactions_path = self.dir.join(TRANSACTIONS_FILE);
        let previous_len = file_len(&transactions_path)?;

        let written = append_rows(&transactions_path, previous_len, created)
            .and_then(|()| replace_file(&self.dir.join(ACCOUNTS_FILE), &account_rows(snapshot)));

        if let Err(e) = written {
            if let Err(rollback) = truncate(&transactions_path, previous_len) {
                error!(
                    path = %transactions_path.display(),
                    error = %rollback,
                    "failed to roll back transaction log"
                );
            }
            return Err(e);
        }

        debug!(
            accounts = snapshot.accounts.len(),
            appended = created.len(),
            "ledger persisted"
        );
        Ok(())
    }
}

fn account_rows(snapshot: &Snapshot) -> Vec<AccountRow> {
    snapshot.accounts.values().map(account_to_row).collect()
}

impl LedgerStore for CsvLedgerStore {
    fn find_by_id(&self, account_id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.lock().accounts.get(&account_id).cloned())
    }

    fn save(&self, account: Account) -> Result<Account, LedgerError> {
        self.commit(vec![account])?
            .pop()
            .ok_or_else(|| LedgerError::IoError {
                message: "save produced no account".to_string(),
            })
    }

    /// Both accounts are version-checked, then written in one snapshot
    fn commit_transfer(&self, to: Account, from: Account) -> Result<(), LedgerError> {
        self.commit(vec![to, from]).map(|_| ())
    }
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, LedgerError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;
    let rows = reader
        .deserialize()
        .map(|row| row.map_err(LedgerError::from))
        .collect();
    rows
}

/// Length of `path` in bytes, 0 if it does not exist
fn file_len(path: &Path) -> Result<u64, LedgerError> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Append `rows` to the CSV file at `path`, which is `len` bytes long
///
/// The header is written only when the file is empty.
fn append_rows<T: serde::Serialize>(
    path: &Path,
    len: u64,
    rows: &[T],
) -> Result<(), LedgerError> {
    if rows.is_empty() {
        return Ok(());
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = WriterBuilder::new().has_headers(len == 0).from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn truncate(path: &Path, len: u64) -> Result<(), LedgerError> {
    if !path.exists() {
        return Ok(());
    }
    OpenOptions::new().write(true).open(path)?.set_len(len)?;
    Ok(())
}

/// Write `rows` to a temporary sibling of `path`, then rename it over `path`
fn replace_file<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<(), LedgerError> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
