//! Synchronous processing strategy
//!
//! Streams rows through [`TransferReader`] and applies each one before
//! reading the next, so transfers run strictly in file order. Memory use is
//! independent of the file size.

use crate::core::TransferEngine;
use crate::io::sync_reader::TransferReader;
use crate::strategy::{BatchSummary, BatchTally, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Single-threaded, in-order strategy
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        engine: &Arc<TransferEngine>,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<BatchSummary, LedgerError> {
        let mut reader = TransferReader::open(input_path)?;
        let mut tally = BatchTally::default();

        while let Some(row) = reader.next() {
            match row {
                Ok(record) => {
                    let result = engine.transfer(record.to_account_id, &record.request);
                    tally.outcome(&record, result);
                }
                Err(e) => tally.malformed(Some(reader.line()), &e),
            }
        }

        let summary = tally.finish(engine, output)?;
        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            malformed = summary.malformed,
            "sync batch finished"
        );
        Ok(summary)
    }
}
