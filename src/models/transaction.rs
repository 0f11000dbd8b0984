use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of balance operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Places a hold on part of the balance.
    Use,
    /// Reverses a previous `Use` in full.
    Cancel,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Use => "USE",
            TransactionType::Cancel => "CANCEL",
        }
    }
}

/// Outcome of an operation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionResult {
    Success,
    Fail,
}

impl TransactionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionResult::Success => "SUCCESS",
            TransactionResult::Fail => "FAIL",
        }
    }
}

/// Immutable record of one use/cancel attempt against an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub result: TransactionResult,
    pub amount: i64,
    /// Account balance after this operation took effect.
    pub balance_snapshot: i64,
    pub transacted_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        account_number: impl Into<String>,
        transaction_type: TransactionType,
        result: TransactionResult,
        amount: i64,
        balance_snapshot: i64,
    ) -> Self {
        Self {
            transaction_id: new_transaction_id(),
            account_number: account_number.into(),
            transaction_type,
            result,
            amount,
            balance_snapshot,
            transacted_at: Utc::now(),
        }
    }

    pub fn success(
        account_number: impl Into<String>,
        transaction_type: TransactionType,
        amount: i64,
        balance_snapshot: i64,
    ) -> Self {
        Self::new(
            account_number,
            transaction_type,
            TransactionResult::Success,
            amount,
            balance_snapshot,
        )
    }

    /// Audit row for a rejected attempt; the balance snapshot is left unchanged.
    pub fn failure(
        account_number: impl Into<String>,
        transaction_type: TransactionType,
        amount: i64,
        current_balance: i64,
    ) -> Self {
        Self::new(
            account_number,
            transaction_type,
            TransactionResult::Fail,
            amount,
            current_balance,
        )
    }

    pub fn with_transacted_at(mut self, transacted_at: DateTime<Utc>) -> Self {
        self.transacted_at = transacted_at;
        self
    }

    pub fn belongs_to(&self, account_number: &str) -> bool {
        self.account_number == account_number
    }

    /// Whether this transaction may still be cancelled at `now`.
    ///
    /// The window is calendar based and inclusive: a transaction made exactly
    /// `window_months` ago is still cancellable.
    pub fn is_cancellable_at(&self, now: DateTime<Utc>, window_months: u32) -> bool {
        match now.checked_sub_months(Months::new(window_months)) {
            Some(cutoff) => self.transacted_at >= cutoff,
            None => true,
        }
    }
}

/// Generates an opaque transaction identifier (32 lowercase hex characters).
pub fn new_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}
