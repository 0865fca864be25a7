//! Batch transfer strategies
//!
//! A strategy reads a transfer batch file, runs every well-formed row
//! through a shared [`TransferEngine`] and writes the resulting balances of
//! the accounts it touched. The synchronous strategy applies rows one by
//! one; the asynchronous one reads in batches and runs unrelated transfers
//! in parallel.

use crate::cli::StrategyType;
use crate::core::TransferEngine;
use crate::io::csv_format::write_balances_csv;
use crate::types::{AccountId, BalanceDetails, LedgerError, TransferRecord};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Row counts for one processed batch file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Transfers the engine committed
    pub applied: usize,
    /// Well-formed rows the engine refused
    pub rejected: usize,
    /// Rows that could not be parsed
    pub malformed: usize,
}

/// A complete batch pipeline: read, transfer, report
pub trait ProcessingStrategy: Send + Sync {
    /// Apply every transfer in `input_path` through `engine`
    ///
    /// Writes `account_id,balance,currency` for each account touched by an
    /// applied transfer to `output`, sorted by id.
    ///
    /// # Errors
    ///
    /// Only failures that stop the whole batch are returned: the input
    /// cannot be opened, the runtime cannot start, a worker task dies, or
    /// output cannot be written. A bad row is logged and counted in the
    /// summary.
    fn process(
        &self,
        engine: &Arc<TransferEngine>,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<BatchSummary, LedgerError>;
}

/// Create a processing strategy for `strategy_type`
///
/// `config` is only used by the async strategy and defaults when absent.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(config.unwrap_or_default())),
    }
}

/// Outcome bookkeeping shared by both strategies
#[derive(Debug, Default)]
pub(crate) struct BatchTally {
    summary: BatchSummary,
    touched: BTreeSet<AccountId>,
}

impl BatchTally {
    pub(crate) fn malformed(&mut self, line: Option<u64>, error: &LedgerError) {
        warn!(line = ?line, error = %error, "skipping malformed transfer row");
        self.summary.malformed += 1;
    }

    pub(crate) fn outcome(&mut self, record: &TransferRecord, result: Result<(), LedgerError>) {
        match result {
            Ok(()) => {
                self.summary.applied += 1;
                self.touched.insert(record.to_account_id);
                self.touched.insert(record.request.from_account_id);
            }
            Err(error) => {
                warn!(
                    to = record.to_account_id,
                    from = record.request.from_account_id,
                    error = %error,
                    "transfer rejected"
                );
                self.summary.rejected += 1;
            }
        }
    }

    pub(crate) fn merge(&mut self, other: BatchTally) {
        self.summary.applied += other.summary.applied;
        self.summary.rejected += other.summary.rejected;
        self.summary.malformed += other.summary.malformed;
        self.touched.extend(other.touched);
    }

    /// Write final balances of the touched accounts and return the summary
    pub(crate) fn finish(
        self,
        engine: &TransferEngine,
        output: &mut dyn Write,
    ) -> Result<BatchSummary, LedgerError> {
        let balances = self
            .touched
            .iter()
            .map(|&account_id| engine.get_balance(account_id))
            .collect::<Result<Vec<BalanceDetails>, _>>()?;

        write_balances_csv(&balances, output)?;
        Ok(self.summary)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{create_temp_csv, engine_with};
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::sync(StrategyType::Sync)]
    #[case::async_default(StrategyType::Async)]
    fn test_create_strategy_runs_batch(#[case] strategy_type: StrategyType) {
        let engine = engine_with(&[1, 2], 100);
        let file = create_temp_csv("1,2,10,debit,\n");
        let mut output = Vec::new();

        let strategy = create_strategy(strategy_type, None);
        let summary = strategy.process(&engine, file.path(), &mut output).unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                applied: 1,
                rejected: 0,
                malformed: 0
            }
        );
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account_id,balance,currency\n1,90,NOK\n2,110,NOK\n"
        );
    }
}
