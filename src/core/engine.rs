//! Transfer engine
//!
//! This module provides the `TransferEngine`, which serves balance and
//! mini-statement queries and moves funds between two accounts.
//!
//! A transfer runs as a sequence of guarded steps. Any failed guard aborts
//! before the first persisted write:
//! 1. Load the destination account
//! 2. Load the source account
//! 3. Check funds against the destination balance (both directions)
//! 4. Compute both new balances and reject any that would go negative
//! 5. Record the transaction on the destination account and commit both sides
//!
//! A zero-amount transfer that passes the guards is a successful no-op.

use crate::core::account_locks::AccountLocks;
use crate::core::traits::LedgerStore;
use crate::types::{
    Account, AccountId, BalanceDetails, LedgerError, StatementEntry, Transaction,
    TransactionType, TransferRequest,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// Which side of a transfer a balance belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Destination,
    Source,
}

/// Orchestrates queries and transfers over a [`LedgerStore`]
///
/// The store handle is injected at construction. Transfers on one engine are
/// serialized per account, so the engine can be shared between threads
/// behind an `Arc`.
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
    locks: AccountLocks,
}

impl TransferEngine {
    /// Create an engine over `store`
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        TransferEngine {
            store,
            locks: AccountLocks::new(),
        }
    }

    fn load(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .find_by_id(account_id)?
            .ok_or_else(|| LedgerError::account_not_found(account_id))
    }

    /// Read an account's balance and currency
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no account exists for `account_id`.
    pub fn get_balance(&self, account_id: AccountId) -> Result<BalanceDetails, LedgerError> {
        let account = self.load(account_id)?;
        debug!(account_id, balance = %account.balance(), "balance query");
        Ok(account.balance_details())
    }

    /// List every transaction the account owns
    ///
    /// Each entry carries the account's own id and currency alongside the
    /// transaction's amount, type and date. Order follows the store and is
    /// not part of the contract.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no account exists for `account_id`.
    pub fn get_mini_statement(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<StatementEntry>, LedgerError> {
        let account = self.load(account_id)?;
        debug!(
            account_id,
            entries = account.transactions().len(),
            "mini statement query"
        );

        Ok(account
            .transactions()
            .iter()
            .map(|tx| StatementEntry {
                account_id: account.account_id(),
                amount: tx.amount(),
                currency_code: account.currency(),
                tx_type: tx.tx_type(),
                transaction_date: tx.transaction_date(),
            })
            .collect())
    }

    /// Move `request.amount` between `request.from_account_id` and `to_account_id`
    ///
    /// For `Debit` the destination balance decreases and the source balance
    /// increases by the amount; `Credit` inverts both signs. The new
    /// transaction is recorded on the destination account, tagged with the
    /// source account's id.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount is negative
    /// - `AccountNotFound` if either account does not exist
    /// - `SelfTransfer` if both ids name the same account
    /// - `InsufficientFunds` if the destination balance does not exceed the
    ///   amount, or if either new balance would be negative
    /// - `ArithmeticOverflow` if a new balance cannot be represented
    /// - any store error raised while committing
    pub fn transfer(
        &self,
        to_account_id: AccountId,
        request: &TransferRequest,
    ) -> Result<(), LedgerError> {
        if request.amount < Decimal::ZERO {
            return Err(LedgerError::invalid_amount(request.amount));
        }

        self.locks
            .with_locked(&[to_account_id, request.from_account_id], || {
                self.transfer_locked(to_account_id, request)
            })
    }

    fn transfer_locked(
        &self,
        to_account_id: AccountId,
        request: &TransferRequest,
    ) -> Result<(), LedgerError> {
        let mut to_account = self.load(to_account_id)?;
        let mut from_account = self.load(request.from_account_id)?;

        if to_account_id == request.from_account_id {
            return Err(LedgerError::self_transfer(to_account_id));
        }

        validate_funds(request, &to_account)?;

        if request.amount.is_zero() {
            debug!(
                to = to_account_id,
                from = request.from_account_id,
                "zero-amount transfer, nothing to apply"
            );
            return Ok(());
        }

        let new_to_balance = apply(&to_account, request, Side::Destination)?;
        let new_from_balance = apply(&from_account, request, Side::Source)?;

        let transaction_date = request.transaction_date.unwrap_or_else(Utc::now);
        to_account.set_balance(new_to_balance);
        to_account.record(Transaction::new(
            request.from_account_id,
            request.amount,
            request.tx_type,
            transaction_date,
        ));
        from_account.set_balance(new_from_balance);

        self.store.commit_transfer(to_account, from_account)?;

        info!(
            to = to_account_id,
            from = request.from_account_id,
            amount = %request.amount,
            tx_type = %request.tx_type,
            "transfer committed"
        );
        Ok(())
    }
}

/// Funds check applied before any balance is computed
///
/// Both directions are checked against the destination balance, which must
/// strictly exceed the amount.
fn validate_funds(request: &TransferRequest, to_account: &Account) -> Result<(), LedgerError> {
    let balance = match request.tx_type {
        TransactionType::Credit | TransactionType::Debit => to_account.balance(),
    };

    if balance <= request.amount {
        return Err(LedgerError::insufficient_funds(
            to_account.account_id(),
            balance,
            request.amount,
        ));
    }
    Ok(())
}

/// New balance of one side of the transfer
///
/// Debit takes from the destination and gives to the source; credit does
/// the opposite. A result below zero is rejected.
fn apply(account: &Account, request: &TransferRequest, side: Side) -> Result<Decimal, LedgerError> {
    let balance = account.balance();
    let increases = matches!(
        (request.tx_type, side),
        (TransactionType::Credit, Side::Destination) | (TransactionType::Debit, Side::Source)
    );

    let new_balance = if increases {
        balance.checked_add(request.amount)
    } else {
        balance.checked_sub(request.amount)
    }
    .ok_or_else(|| LedgerError::arithmetic_overflow("transfer", account.account_id()))?;

    if new_balance < Decimal::ZERO {
        return Err(LedgerError::insufficient_funds(
            account.account_id(),
            balance,
            request.amount,
        ));
    }
    Ok(new_balance)
}
