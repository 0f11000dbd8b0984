use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AccountError, AppError, ErrorCode};

/// Lifecycle state of an account. Transitions are one-way: `InUse -> Unregistered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    InUse,
    Unregistered,
}

impl AccountStatus {
    pub fn is_in_use(&self) -> bool {
        matches!(self, AccountStatus::InUse)
    }
}

/// A balance-holding account owned by an [`AccountUser`](super::AccountUser).
///
/// `balance` is expressed in the smallest currency unit and never goes below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub account_number: String,
    pub account_user_id: i64,
    pub status: AccountStatus,
    pub balance: i64,
    pub registered_at: DateTime<Utc>,
    pub unregistered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// First number issued when no account exists yet.
    pub const FIRST_ACCOUNT_NUMBER: &'static str = "1000000000";

    pub fn new(account_user_id: i64, account_number: String, initial_balance: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            account_number,
            account_user_id,
            status: AccountStatus::InUse,
            balance: initial_balance,
            registered_at: now,
            unregistered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.account_user_id == user_id
    }

    /// Balance that would remain after using `amount`.
    pub fn balance_after_use(&self, amount: i64) -> Result<i64, AccountError> {
        if amount > self.balance {
            return Err(AccountError::with_message(
                ErrorCode::AmountExceedBalance,
                format!(
                    "Amount {} exceeds balance {} of account {}",
                    amount, self.balance, self.account_number
                ),
            ));
        }
        Ok(self.balance - amount)
    }

    /// Balance after restoring a cancelled amount.
    ///
    /// Overflow is an arithmetic fault, not a business rejection.
    pub fn balance_after_cancel(&self, amount: i64) -> Result<i64, AppError> {
        self.balance.checked_add(amount).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Balance overflow on account {}",
                self.account_number
            ))
        })
    }

    pub fn use_balance(&mut self, amount: i64) -> Result<(), AccountError> {
        self.balance = self.balance_after_use(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn cancel_balance(&mut self, amount: i64) -> Result<(), AppError> {
        self.balance = self.balance_after_cancel(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Marks the account as unregistered. Has no effect on an already unregistered account.
    pub fn unregister(&mut self) {
        if self.status.is_in_use() {
            let now = Utc::now();
            self.status = AccountStatus::Unregistered;
            self.unregistered_at = Some(now);
            self.updated_at = now;
        }
    }

    /// Number issued after `last`, or the first number when nothing was issued yet.
    pub fn next_account_number(last: Option<&str>) -> Result<String, AccountError> {
        match last {
            None => Ok(Self::FIRST_ACCOUNT_NUMBER.to_string()),
            Some(number) => number
                .parse::<u64>()
                .ok()
                .and_then(|n| n.checked_add(1))
                .map(|n| n.to_string())
                .ok_or_else(|| {
                    AccountError::with_message(
                        ErrorCode::InternalServerError,
                        format!("Malformed account number '{}'", number),
                    )
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(balance: i64) -> Account {
        Account::new(1, "1000000000".to_string(), balance)
    }

    #[test]
    fn test_new_account_is_in_use() {
        let account = account(10_000);
        assert_eq!(account.status, AccountStatus::InUse);
        assert!(account.is_owned_by(1));
        assert!(!account.is_owned_by(2));
        assert!(account.unregistered_at.is_none());
    }

    #[test]
    fn test_use_balance() {
        let mut account = account(10_000);
        account.use_balance(500).unwrap();
        assert_eq!(account.balance, 9_500);

        account.use_balance(9_500).unwrap();
        assert_eq!(account.balance, 0);
    }

    #[test]
    fn test_use_balance_exceeding() {
        let mut account = account(10_000);
        let err = account.use_balance(10_001).unwrap_err();
        assert_eq!(err.code, ErrorCode::AmountExceedBalance);
        assert_eq!(account.balance, 10_000);
    }

    #[test]
    fn test_cancel_balance() {
        let mut account = account(9_000);
        account.cancel_balance(1_000).unwrap();
        assert_eq!(account.balance, 10_000);
    }

    #[test]
    fn test_cancel_balance_overflow_is_not_a_business_error() {
        let mut account = account(i64::MAX - 10);
        let err = account.cancel_balance(100).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(err.code().is_none());
        assert!(!err.is_auditable());
        assert_eq!(account.balance, i64::MAX - 10);
    }

    #[test]
    fn test_unregister_is_one_way() {
        let mut account = account(0);
        account.unregister();
        let first = account.unregistered_at;
        assert_eq!(account.status, AccountStatus::Unregistered);

        account.unregister();
        assert_eq!(account.unregistered_at, first);
    }

    #[test]
    fn test_next_account_number() {
        assert_eq!(Account::next_account_number(None).unwrap(), "1000000000");
        assert_eq!(
            Account::next_account_number(Some("1000000011")).unwrap(),
            "1000000012"
        );
        assert!(Account::next_account_number(Some("abc")).is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&AccountStatus::Unregistered).unwrap();
        assert_eq!(json, "\"UNREGISTERED\"");
    }
}
