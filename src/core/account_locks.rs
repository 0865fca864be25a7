//! Per-account mutual exclusion for transfers
//!
//! A transfer loads two accounts, validates, and writes them back. Two
//! transfers touching the same account must not interleave between the load
//! and the write, or one of them loses its update. `AccountLocks` hands out
//! one mutex per account id, created on first use and dropped again once no
//! caller holds or waits for it.
//!
//! # Deadlock Freedom
//!
//! Locks are always taken in ascending account-id order, so two transfers
//! over the same pair of accounts in opposite directions cannot deadlock.

use crate::types::AccountId;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registry of per-account locks
///
/// The `DashMap` shard lock is held only while the account's mutex is looked
/// up, inserted or evicted, never while the mutex itself is held. Every
/// caller holding or waiting for a mutex keeps an `Arc` to it, so an entry
/// whose only reference is the map's own is idle and can be evicted.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        let entry = self
            .locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }

    /// Run `f` while holding the locks of every account in `account_ids`
    ///
    /// Duplicate ids are locked once. A poisoned lock is recovered: the
    /// guarded data is `()`, so a panicking holder cannot leave it corrupt.
    pub fn with_locked<T>(&self, account_ids: &[AccountId], f: impl FnOnce() -> T) -> T {
        let mut ids = account_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mutexes: Vec<Arc<Mutex<()>>> = ids.iter().map(|&id| self.lock_for(id)).collect();
        let result = {
            let _guards: Vec<MutexGuard<'_, ()>> = mutexes
                .iter()
                .map(|mutex| mutex.lock().unwrap_or_else(PoisonError::into_inner))
                .collect();
            f()
        };

        drop(mutexes);
        self.evict_idle(&ids);
        result
    }

    fn evict_idle(&self, account_ids: &[AccountId]) {
        for id in account_ids {
            self.locks.remove_if(id, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }

    /// Number of accounts currently locked or awaited
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_with_locked_returns_closure_value() {
        let locks = AccountLocks::new();
        let value = locks.with_locked(&[1, 2], || 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_entries_live_only_while_held() {
        let locks = AccountLocks::new();

        let held = locks.with_locked(&[1, 2], || locks.len());

        assert_eq!(held, 2);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_many_distinct_ids_leave_no_entries() {
        let locks = AccountLocks::new();
        for id in 0..10_000 {
            locks.with_locked(&[id, id + 1], || ());
        }
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn test_entry_survives_while_another_thread_waits() {
        let locks = Arc::new(AccountLocks::new());
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let holder = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || {
                locks.with_locked(&[9], || {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                });
            })
        };
        entered_rx.recv().unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.with_locked(&[9], || "waited"))
        };
        assert_eq!(locks.len(), 1);
        release_tx.send(()).unwrap();

        holder.join().unwrap();
        assert_eq!(waiter.join().unwrap(), "waited");
        assert!(locks.is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_locked_once() {
        let locks = AccountLocks::new();
        // Locking the same std mutex twice on one thread would deadlock.
        let value = locks.with_locked(&[7, 7], || locks.len());
        assert_eq!(value, 1);
    }

    #[test]
    fn test_opposite_order_pairs_do_not_deadlock() {
        let locks = Arc::new(AccountLocks::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let locks = Arc::clone(&locks);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let pair = if i % 2 == 0 { [1, 2] } else { [2, 1] };
                        locks.with_locked(&pair, || {
                            counter.fetch_add(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1600);
    }

    #[test]
    fn test_lock_excludes_concurrent_holders() {
        let locks = Arc::new(AccountLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    for _ in 0..100 {
                        locks.with_locked(&[5], || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_inside.fetch_max(now, Ordering::SeqCst);
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
