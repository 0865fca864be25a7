//! CSV formats for ledger files and transfer batches
//!
//! This module centralizes all CSV format concerns, providing:
//! - Row structures for `accounts.csv` and `transactions.csv`
//! - The transfer-request row read from batch files
//! - Conversion between rows and domain types
//! - Balance output serialization
//!
//! Conversions are pure (no I/O) apart from the final writer.

use crate::types::{
    Account, AccountId, BalanceDetails, LedgerError, Transaction, TransactionId,
    TransactionType, TransferRecord, TransferRequest,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;

/// One line of `accounts.csv`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AccountRow {
    pub account_id: AccountId,
    pub balance: String,
    pub currency: String,
    #[serde(default)]
    pub version: u64,
}

/// One line of `transactions.csv`
///
/// `owner_account_id` is the account whose history holds the record;
/// `account_id` is the counterparty the amount describes.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TransactionRow {
    pub transaction_id: TransactionId,
    pub owner_account_id: AccountId,
    pub account_id: AccountId,
    pub amount: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub transaction_date: String,
}

/// One line of a transfer batch file
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TransferRow {
    pub to_account: AccountId,
    pub from_account: AccountId,
    pub amount: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub transaction_date: Option<String>,
}

/// Parse a non-negative decimal amount
pub fn parse_amount(raw: &str) -> Result<Decimal, LedgerError> {
    let amount = Decimal::from_str(raw.trim()).map_err(|_| LedgerError::invalid_amount(raw))?;
    if amount < Decimal::ZERO {
        return Err(LedgerError::invalid_amount(raw));
    }
    Ok(amount)
}

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| LedgerError::ParseError {
            line: None,
            message: format!("invalid timestamp '{}': {}", raw, e),
        })
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Convert a transfer row into a destination id and engine request
///
/// The type is checked here, so an unknown tag never reaches the engine.
pub fn convert_transfer_row(row: TransferRow) -> Result<TransferRecord, LedgerError> {
    let tx_type = TransactionType::from_str(&row.tx_type)?;
    let amount = parse_amount(&row.amount)?;
    let mut request = TransferRequest::new(row.from_account, amount, tx_type)?;

    if let Some(raw) = row.transaction_date.as_deref() {
        if !raw.trim().is_empty() {
            request = request.at(parse_date(raw)?);
        }
    }

    Ok(TransferRecord {
        to_account_id: row.to_account,
        request,
    })
}

/// Rebuild a persisted transaction
pub fn transaction_from_row(row: &TransactionRow) -> Result<Transaction, LedgerError> {
    Ok(Transaction::restored(
        row.transaction_id,
        row.owner_account_id,
        row.account_id,
        parse_amount(&row.amount)?,
        TransactionType::from_str(&row.tx_type)?,
        parse_date(&row.transaction_date)?,
    ))
}

/// Rebuild a persisted account together with the transactions it owns
///
/// Negative balances are rejected.
pub fn account_from_row(
    row: &AccountRow,
    transactions: Vec<Transaction>,
) -> Result<Account, LedgerError> {
    let balance = Decimal::from_str(row.balance.trim())
        .map_err(|_| LedgerError::invalid_amount(&row.balance))?;
    if balance < Decimal::ZERO {
        return Err(LedgerError::ParseError {
            line: None,
            message: format!("account {} has negative balance {}", row.account_id, balance),
        });
    }
    let mut account = Account::new(row.account_id, balance, row.currency.parse()?)
        .with_transactions(transactions);
    account.set_version(row.version);
    Ok(account)
}

pub fn account_to_row(account: &Account) -> AccountRow {
    AccountRow {
        account_id: account.account_id(),
        balance: account.balance().to_string(),
        currency: account.currency().to_string(),
        version: account.version(),
    }
}

/// Row for a saved transaction; `None` if the store has not assigned an id yet
pub fn transaction_to_row(transaction: &Transaction) -> Option<TransactionRow> {
    Some(TransactionRow {
        transaction_id: transaction.transaction_id()?,
        owner_account_id: transaction.owner(),
        account_id: transaction.account_id(),
        amount: transaction.amount().to_string(),
        tx_type: transaction.tx_type().to_string(),
        transaction_date: format_date(transaction.transaction_date()),
    })
}

/// Write balances in CSV format with columns: account_id, balance, currency
///
/// Rows are sorted by account id for deterministic output.
pub fn write_balances_csv(
    balances: &[BalanceDetails],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account_id", "balance", "currency"])?;

    let mut sorted = balances.to_vec();
    sorted.sort_by_key(|details| details.account_id);

    for details in sorted {
        writer.write_record(&[
            details.account_id.to_string(),
            details.balance.to_string(),
            details.currency_code.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
