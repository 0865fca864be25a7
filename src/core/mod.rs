//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - The `LedgerStore` persistence contract
//! - `engine` - Balance and statement queries, and the transfer algorithm
//! - `account_locks` - Per-account serialization of transfers
//! - `memory_store` - Deterministic in-memory `LedgerStore`

pub mod account_locks;
pub mod engine;
pub mod memory_store;
pub mod traits;

pub use account_locks::AccountLocks;
pub use engine::TransferEngine;
pub use memory_store::MemoryLedgerStore;
pub use traits::LedgerStore;
