//! Synchronous reader for transfer batch files
//!
//! Streams [`TransferRecord`]s out of a CSV file one row at a time. Row
//! parsing is delegated to [`csv_format::convert_transfer_row`], so the
//! reader only owns the file handle and the line counter.
//!
//! ```no_run
//! use intrabank_transfer::io::sync_reader::TransferReader;
//! use std::path::Path;
//!
//! let mut reader = TransferReader::open(Path::new("transfers.csv")).unwrap();
//! while let Some(result) = reader.next() {
//!     match result {
//!         Ok(record) => println!("line {}: {:?}", reader.line(), record),
//!         Err(e) => eprintln!("line {}: {}", reader.line(), e),
//!     }
//! }
//! ```
//!
//! Opening fails with `FileNotFound` for a missing file. Malformed rows are
//! yielded as `Err` and iteration continues with the next row.
//!
//! [`csv_format::convert_transfer_row`]: crate::io::csv_format::convert_transfer_row

use crate::io::csv_format::{convert_transfer_row, TransferRow};
use crate::types::{LedgerError, TransferRecord};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Streaming iterator over the rows of a transfer batch file
#[derive(Debug)]
pub struct TransferReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl TransferReader {
    /// Open a transfer batch file
    ///
    /// Fields are trimmed and a missing trailing `transaction_date` column
    /// is tolerated.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| LedgerError::open_failed(path, e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            // the header occupies line 1
            line_num: 1,
        })
    }

    /// File line of the row most recently yielded
    pub fn line(&self) -> u64 {
        self.line_num
    }
}

impl Iterator for TransferReader {
    type Item = Result<TransferRecord, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut rows = self.reader.deserialize::<TransferRow>();
        let row = rows.next()?;
        self.line_num += 1;

        Some(match row {
            Ok(row) => convert_transfer_row(row),
            Err(e) => Err(LedgerError::ParseError {
                line: Some(self.line_num),
                message: e.to_string(),
            }),
        })
    }
}
