//! Asynchronous batch processing strategy
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncTransferReader (batch CSV reading)
//!     ├── partition_connected (groups of transfers sharing accounts)
//!     └── Arc<TransferEngine> (shared, per-account locked)
//! ```
//!
//! Batches are processed one after another. Inside a batch, transfers are
//! split into groups such that no two groups name a common account; each
//! group runs sequentially in its own tokio task and groups run in
//! parallel. Every account therefore sees its transfers in file order, and
//! the final balances equal those of the sync strategy.

use crate::core::TransferEngine;
use crate::io::async_reader::AsyncTransferReader;
use crate::strategy::{BatchSummary, BatchTally, ProcessingStrategy};
use crate::types::{AccountId, LedgerError, TransferRecord};
use futures::future::join_all;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of rows per batch
    pub batch_size: usize,
    /// Worker threads for the tokio runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a config, replacing zero values with defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                default = default.batch_size,
                "invalid batch_size 0, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches 0, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Multi-threaded batch strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

/// Split `batch` into groups of transfers connected through shared accounts
///
/// Two transfers land in the same group when they name a common account,
/// directly or through a chain of other transfers. Groups keep the
/// relative input order of their transfers and are returned ordered by
/// their first transfer.
pub fn partition_connected(batch: Vec<TransferRecord>) -> Vec<Vec<TransferRecord>> {
    let mut roots = AccountUnion::default();
    for record in &batch {
        roots.union(record.to_account_id, record.request.from_account_id);
    }

    let mut group_of_root: HashMap<AccountId, usize> = HashMap::new();
    let mut groups: Vec<Vec<TransferRecord>> = Vec::new();

    for record in batch {
        let root = roots.find(record.to_account_id);
        let index = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[index].push(record);
    }

    groups
}

/// Disjoint-set forest over account ids
#[derive(Debug, Default)]
struct AccountUnion {
    parent: HashMap<AccountId, AccountId>,
}

impl AccountUnion {
    fn find(&mut self, account_id: AccountId) -> AccountId {
        let mut root = account_id;
        while let Some(&parent) = self.parent.get(&root) {
            if parent == root {
                break;
            }
            root = parent;
        }

        // path compression
        let mut current = account_id;
        while current != root {
            let next = self.parent.get(&current).copied().unwrap_or(root);
            self.parent.insert(current, root);
            current = next;
        }

        self.parent.entry(root).or_insert(root);
        root
    }

    fn union(&mut self, a: AccountId, b: AccountId) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent.insert(root_a.max(root_b), root_a.min(root_b));
        }
    }
}

/// Apply one group's transfers in input order
fn run_group(engine: &TransferEngine, group: Vec<TransferRecord>) -> BatchTally {
    let mut tally = BatchTally::default();
    for record in group {
        let result = engine.transfer(record.to_account_id, &record.request);
        tally.outcome(&record, result);
    }
    tally
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        engine: &Arc<TransferEngine>,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<BatchSummary, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("failed to start tokio runtime: {}", e),
            })?;

        let tally = runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| LedgerError::open_failed(input_path, e))?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncTransferReader::new(compat_file);

            let mut tally = BatchTally::default();
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                let mut records = Vec::with_capacity(batch.len());
                for row in batch {
                    match row {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            let line = match &e {
                                LedgerError::ParseError { line, .. } => *line,
                                _ => None,
                            };
                            tally.malformed(line, &e);
                        }
                    }
                }

                let groups = partition_connected(records);
                debug!(groups = groups.len(), "dispatching batch");

                let tasks = groups.into_iter().map(|group| {
                    let engine = Arc::clone(engine);
                    tokio::spawn(async move { run_group(&engine, group) })
                });

                // Wait for the whole batch before reading the next one so an
                // account spanning batches keeps file order.
                for joined in join_all(tasks).await {
                    // A lost group may have committed transfers; its counts
                    // and touched accounts are unknown.
                    let group_tally = joined.map_err(|e| {
                        error!(error = %e, "transfer group task failed");
                        LedgerError::WorkerFailed {
                            message: e.to_string(),
                        }
                    })?;
                    tally.merge(group_tally);
                }
            }

            Ok::<_, LedgerError>(tally)
        })?;

        let summary = tally.finish(engine, output)?;
        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            malformed = summary.malformed,
            batch_size = self.config.batch_size,
            "async batch finished"
        );
        Ok(summary)
    }
}
