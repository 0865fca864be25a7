//! End-to-end integration tests
//!
//! Each fixture under tests/fixtures/ holds:
//! - `accounts.csv` - the starting ledger
//! - `input.csv` - a transfer batch
//! - `expected.csv` - balances of the touched accounts afterwards
//!
//! The ledger is copied into a temporary directory, opened as a
//! `CsvLedgerStore`, and the batch is applied with every strategy. The
//! output must match `expected.csv`, and reopening the ledger must show the
//! same balances on disk.

#[cfg(test)]
mod tests {
    use intrabank_transfer::cli::StrategyType;
    use intrabank_transfer::strategy::{
        create_strategy, AsyncProcessingStrategy, BatchConfig, ProcessingStrategy,
    };
    use intrabank_transfer::{
        CsvLedgerStore, LedgerError, MemoryLedgerStore, TransactionType, TransferEngine,
        TransferRequest,
    };
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Copy)]
    enum Pipeline {
        Sync,
        AsyncDefault,
        /// Two rows per batch, forcing accounts to span batches
        AsyncSmallBatches,
    }

    fn strategy_for(pipeline: Pipeline) -> Box<dyn ProcessingStrategy> {
        match pipeline {
            Pipeline::Sync => create_strategy(StrategyType::Sync, None),
            Pipeline::AsyncDefault => create_strategy(StrategyType::Async, None),
            Pipeline::AsyncSmallBatches => {
                Box::new(AsyncProcessingStrategy::new(BatchConfig::new(2, 2)))
            }
        }
    }

    fn ledger_from_fixture(fixture_dir: &Path) -> TempDir {
        let ledger = TempDir::new().expect("Failed to create temp dir");
        fs::copy(
            fixture_dir.join("accounts.csv"),
            ledger.path().join("accounts.csv"),
        )
        .expect("Failed to copy accounts.csv");
        ledger
    }

    fn run_test_fixture(fixture_name: &str, pipeline: Pipeline) {
        let fixture_dir = Path::new("tests/fixtures").join(fixture_name);
        let input_path = fixture_dir.join("input.csv");
        let expected_path = fixture_dir.join("expected.csv");

        assert!(input_path.exists(), "Input file not found: {:?}", input_path);
        assert!(
            expected_path.exists(),
            "Expected file not found: {:?}",
            expected_path
        );

        let ledger = ledger_from_fixture(&fixture_dir);
        let store = Arc::new(CsvLedgerStore::open(ledger.path()).expect("Failed to open ledger"));
        let engine = Arc::new(TransferEngine::new(store));

        let mut output = Vec::new();
        strategy_for(pipeline)
            .process(&engine, &input_path, &mut output)
            .unwrap_or_else(|e| panic!("Failed to process transfers: {}", e));

        let actual_output = String::from_utf8(output).expect("Output is not UTF-8");
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {:?}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (pipeline: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, pipeline, actual_output, expected_output
        );

        // The durable ledger must agree with what was printed.
        let reopened = CsvLedgerStore::open(ledger.path()).expect("Failed to reopen ledger");
        let reopened_engine = TransferEngine::new(Arc::new(reopened));
        for line in expected_output.lines().skip(1) {
            let mut fields = line.split(',');
            let account_id: u32 = fields.next().unwrap().parse().unwrap();
            let balance: Decimal = fields.next().unwrap().parse().unwrap();
            assert_eq!(
                reopened_engine.get_balance(account_id).unwrap().balance,
                balance,
                "persisted balance of {} in fixture {}",
                account_id,
                fixture_name
            );
        }
    }

    #[rstest]
    #[case("happy_path")]
    #[case("insufficient_funds")]
    #[case("invalid_references")]
    #[case("malformed_data")]
    #[case("multiple_accounts")]
    #[case("zero_amount")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(Pipeline::Sync, Pipeline::AsyncDefault, Pipeline::AsyncSmallBatches)]
        pipeline: Pipeline,
    ) {
        run_test_fixture(fixture, pipeline);
    }

    #[test]
    fn test_batch_records_statements_on_destination_only() {
        let fixture_dir = Path::new("tests/fixtures/happy_path");
        let ledger = ledger_from_fixture(fixture_dir);
        let engine = Arc::new(TransferEngine::new(Arc::new(
            CsvLedgerStore::open(ledger.path()).unwrap(),
        )));

        create_strategy(StrategyType::Sync, None)
            .process(&engine, &fixture_dir.join("input.csv"), &mut Vec::new())
            .unwrap();

        let reopened =
            TransferEngine::new(Arc::new(CsvLedgerStore::open(ledger.path()).unwrap()));

        let statement_111 = reopened.get_mini_statement(111).unwrap();
        assert!(statement_111.iter().all(|entry| entry.account_id == 111));
        // Statement order is up to the store.
        let mut entries: Vec<(String, Decimal)> = statement_111
            .iter()
            .map(|entry| (entry.tx_type.to_string(), entry.amount))
            .collect();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                (TransactionType::Credit.to_string(), Decimal::new(250, 2)),
                (TransactionType::Debit.to_string(), Decimal::new(100, 2)),
            ]
        );

        assert!(reopened.get_mini_statement(222).unwrap().is_empty());
        assert_eq!(reopened.get_mini_statement(333).unwrap().len(), 1);
    }

    #[test]
    fn test_fixture_store_scenario() {
        let engine = TransferEngine::new(Arc::new(MemoryLedgerStore::fixture()));

        let balance = engine.get_balance(111).unwrap();
        assert_eq!(balance.balance, Decimal::new(1000, 2));
        assert_eq!(balance.currency_code.as_str(), "NOK");
        assert_eq!(engine.get_mini_statement(111).unwrap().len(), 2);

        let request = TransferRequest::new(222, Decimal::ONE, TransactionType::Debit).unwrap();
        engine.transfer(111, &request).unwrap();
        assert_eq!(engine.get_balance(111).unwrap().balance, Decimal::new(900, 2));
        assert_eq!(engine.get_balance(222).unwrap().balance, Decimal::new(1100, 2));

        assert_eq!(
            engine.get_balance(999).unwrap_err().to_string(),
            "Invalid Account ID 999"
        );
        let too_much =
            TransferRequest::new(222, Decimal::new(50, 0), TransactionType::Debit).unwrap();
        assert!(matches!(
            engine.transfer(111, &too_much),
            Err(LedgerError::InsufficientFunds { account_id: 111, .. })
        ));
    }

    #[test]
    fn test_missing_ledger_directory() {
        let dir = TempDir::new().unwrap();
        let result = CsvLedgerStore::open(dir.path().join("absent"));
        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }
}
