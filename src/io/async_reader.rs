//! Asynchronous reader for transfer batch files
//!
//! Reads transfer rows in fixed-size batches for the async strategy.
//!
//! ```text
//! tokio File → compat → AsyncTransferReader → Vec<Result<TransferRecord>>
//!                                 ↓
//!                        csv_format::convert_transfer_row
//! ```

use crate::io::csv_format::{convert_transfer_row, TransferRow};
use crate::types::{LedgerError, TransferRecord};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Batching CSV reader over any `futures` async byte source
pub struct AsyncTransferReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncTransferReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` rows
    ///
    /// Each row is converted independently; a malformed row is returned as
    /// an `Err` in its position rather than ending the batch. An empty
    /// vector means the input is exhausted.
    pub async fn read_batch(
        &mut self,
        batch_size: usize,
    ) -> Vec<Result<TransferRecord, LedgerError>> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows = self.csv_reader.deserialize::<TransferRow>();

        while batch.len() < batch_size {
            match rows.next().await {
                Some(Ok(row)) => batch.push(convert_transfer_row(row)),
                Some(Err(e)) => batch.push(Err(LedgerError::ParseError {
                    line: e.position().map(|pos| pos.line()),
                    message: e.to_string(),
                })),
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionType;
    use futures::io::Cursor;
    use rust_decimal::Decimal;

    fn reader(rows: &'static str) -> AsyncTransferReader<Cursor<Vec<u8>>> {
        let content = format!("to_account,from_account,amount,type,transaction_date\n{rows}");
        AsyncTransferReader::new(Cursor::new(content.into_bytes()))
    }

    #[tokio::test]
    async fn test_read_batch_splits_input() {
        let mut reader = reader(
            "111,222,1,debit,\n\
             222,111,2,credit,\n\
             333,444,3,debit,\n",
        );

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].as_ref().unwrap().to_account_id, 111);
        assert_eq!(batch[1].as_ref().unwrap().request.tx_type, TransactionType::Credit);

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].as_ref().unwrap().request.amount, Decimal::new(3, 0));

        assert!(reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_read_batch_empty_input() {
        let mut reader = reader("");
        assert!(reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_rows_keep_their_slot() {
        let mut reader = reader(
            "111,222,1,refund,\n\
             x,222,1,debit,\n\
             111,222,1,debit,\n",
        );

        let batch = reader.read_batch(10).await;

        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch[0].as_ref().unwrap_err(),
            &LedgerError::invalid_transaction_type("refund")
        );
        assert!(matches!(batch[1], Err(LedgerError::ParseError { .. })));
        assert!(batch[2].is_ok());
    }

    #[tokio::test]
    async fn test_whitespace_and_case() {
        let mut reader = reader("  111 , 222 , 4.5 , DEBIT , 2024-01-15T09:30:00Z \n");

        let batch = reader.read_batch(10).await;
        let record = batch[0].as_ref().unwrap();

        assert_eq!(record.request.tx_type, TransactionType::Debit);
        assert_eq!(record.request.amount, Decimal::new(45, 1));
        assert!(record.request.transaction_date.is_some());
    }
}
