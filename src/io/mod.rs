//! I/O module
//!
//! Handles everything that touches files.
//!
//! # Components
//!
//! - `csv_format` - Row structures and conversions, balance output
//! - `csv_store` - Durable `LedgerStore` over a directory of CSV files
//! - `sync_reader` - Streaming reader for transfer batch files
//! - `async_reader` - Batching async reader for transfer batch files

pub mod async_reader;
pub mod csv_format;
pub mod csv_store;
pub mod sync_reader;

pub use async_reader::AsyncTransferReader;
pub use csv_format::{convert_transfer_row, write_balances_csv, TransferRow};
pub use csv_store::CsvLedgerStore;
pub use sync_reader::TransferReader;
