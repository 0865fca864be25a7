//! Transaction-related types for the intra-bank transfer ledger
//!
//! This module defines the transaction type tag, the immutable transaction
//! record, the transfer request accepted by the engine, and the
//! mini-statement view.

use super::account::{AccountId, CurrencyCode};
use super::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction identifier, assigned by the ledger store
pub type TransactionId = u64;

/// Direction of a transfer
///
/// The two variants have opposite effects on the destination and the source
/// account. Unknown tags are rejected when parsed, so the balance update
/// logic only ever sees one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Destination balance decreases, source balance increases
    Debit,

    /// Destination balance increases, source balance decreases
    Credit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Debit => "DEBIT",
            TransactionType::Credit => "CREDIT",
        }
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBIT" => Ok(TransactionType::Debit),
            "CREDIT" => Ok(TransactionType::Credit),
            _ => Err(LedgerError::invalid_transaction_type(s)),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a single debit/credit event
///
/// `account_id` names the counterparty the amount describes, which can differ
/// from `owner`, the account whose history holds this record.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    transaction_id: Option<TransactionId>,
    account_id: AccountId,
    amount: Decimal,
    tx_type: TransactionType,
    transaction_date: DateTime<Utc>,
    owner: AccountId,
}

impl Transaction {
    /// Create an unsaved transaction; the store assigns its id
    pub fn new(
        account_id: AccountId,
        amount: Decimal,
        tx_type: TransactionType,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Transaction {
            transaction_id: None,
            account_id,
            amount,
            tx_type,
            transaction_date,
            owner: account_id,
        }
    }

    /// Rebuild a transaction that has already been persisted
    pub(crate) fn restored(
        transaction_id: TransactionId,
        owner: AccountId,
        account_id: AccountId,
        amount: Decimal,
        tx_type: TransactionType,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Transaction {
            transaction_id: Some(transaction_id),
            account_id,
            amount,
            tx_type,
            transaction_date,
            owner,
        }
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn tx_type(&self) -> TransactionType {
        self.tx_type
    }

    pub fn transaction_date(&self) -> DateTime<Utc> {
        self.transaction_date
    }

    /// Id of the account that owns this record
    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub(crate) fn owned_by(mut self, owner: AccountId) -> Self {
        self.owner = owner;
        self
    }

    pub(crate) fn assign_id(&mut self, transaction_id: TransactionId) {
        self.transaction_id = Some(transaction_id);
    }
}

/// Request to move funds into `to_account` from `from_account_id`
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// The paying/receiving counterparty
    pub from_account_id: AccountId,

    /// Non-negative transfer amount
    pub amount: Decimal,

    /// Direction of the transfer, as seen from the destination account
    pub tx_type: TransactionType,

    /// When the transfer happened; defaults to the time it is applied
    pub transaction_date: Option<DateTime<Utc>>,
}

impl TransferRequest {
    /// Build a request, rejecting negative amounts
    pub fn new(
        from_account_id: AccountId,
        amount: Decimal,
        tx_type: TransactionType,
    ) -> Result<Self, LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount));
        }
        Ok(TransferRequest {
            from_account_id,
            amount,
            tx_type,
            transaction_date: None,
        })
    }

    pub fn at(mut self, transaction_date: DateTime<Utc>) -> Self {
        self.transaction_date = Some(transaction_date);
        self
    }
}

/// A transfer request addressed to its destination account
///
/// This is the unit read from batch files.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    pub to_account_id: AccountId,
    pub request: TransferRequest,
}

/// One line of a mini statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementEntry {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub currency_code: CurrencyCode,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
}
