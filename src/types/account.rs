//! Account-related types for the intra-bank transfer ledger
//!
//! This module defines the Account aggregate, the currency code it is
//! denominated in, and the balance view returned by queries.

use super::error::LedgerError;
use super::transaction::Transaction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account identifier
pub type AccountId = u32;

/// Three-letter currency code (ISO 4217 shape), stored upper case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub const NOK: CurrencyCode = CurrencyCode(*b"NOK");

    /// The code as a string slice
    pub fn as_str(&self) -> &str {
        // Construction only admits ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl FromStr for CurrencyCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bytes = trimmed.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(LedgerError::invalid_currency(s));
        }
        Ok(CurrencyCode([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CurrencyCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Balance-holding account aggregate
///
/// Accounts are provisioned outside this crate. The balance only changes
/// through the transfer engine, and the transaction history only grows.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    account_id: AccountId,
    balance: Decimal,
    currency: CurrencyCode,
    transactions: Vec<Transaction>,
    /// Optimistic-concurrency version, bumped by the store on every save
    version: u64,
}

impl Account {
    /// Create an account with no transaction history
    ///
    /// # Arguments
    ///
    /// * `account_id` - Unique id of the account
    /// * `balance` - Opening balance
    /// * `currency` - Currency the account is denominated in
    pub fn new(account_id: AccountId, balance: Decimal, currency: CurrencyCode) -> Self {
        Account {
            account_id,
            balance,
            currency,
            transactions: Vec::new(),
            version: 0,
        }
    }

    /// Replace the transaction history, re-pointing every record at this account
    pub fn with_transactions(mut self, transactions: Vec<Transaction>) -> Self {
        let owner = self.account_id;
        self.transactions = transactions
            .into_iter()
            .map(|tx| tx.owned_by(owner))
            .collect();
        self
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_balance(&mut self, balance: Decimal) {
        self.balance = balance;
    }

    pub(crate) fn record(&mut self, transaction: Transaction) {
        self.transactions.push(transaction.owned_by(self.account_id));
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Give every unsaved transaction an id drawn from `next_id`
    pub(crate) fn assign_transaction_ids(&mut self, mut next_id: impl FnMut() -> u64) {
        for tx in self.transactions.iter_mut().filter(|tx| tx.transaction_id().is_none()) {
            tx.assign_id(next_id());
        }
    }

    /// Balance view of this account
    pub fn balance_details(&self) -> BalanceDetails {
        BalanceDetails {
            account_id: self.account_id,
            balance: self.balance,
            currency_code: self.currency,
        }
    }
}

/// Result of a balance query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDetails {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub currency_code: CurrencyCode,
}
