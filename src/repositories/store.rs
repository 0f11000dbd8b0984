use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Account, AccountUser, TransactionRecord};

/// Read/write access to users and accounts.
///
/// Lookups return `Ok(None)` when the record does not exist; callers map
/// absence to their own error kinds.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_user(&self, user_id: i64) -> Result<Option<AccountUser>>;

    async fn find_account(&self, account_number: &str) -> Result<Option<Account>>;

    /// Appends `transaction` to the log and moves the account's balance to
    /// its snapshot as one atomic write.
    ///
    /// Returns `Ok(None)` and writes nothing if the account does not exist.
    async fn apply_transaction(
        &self,
        transaction: &TransactionRecord,
    ) -> Result<Option<TransactionRecord>>;

    async fn insert_account(&self, account: &Account) -> Result<Account>;

    /// Most recently issued account number, if any.
    async fn last_account_number(&self) -> Result<Option<String>>;

    async fn count_accounts_by_user(&self, user_id: i64) -> Result<i64>;

    async fn find_accounts_by_user(&self, user_id: i64) -> Result<Vec<Account>>;

    /// Persists the unregistered state of `account`.
    async fn unregister_account(&self, account: &Account) -> Result<Option<Account>>;
}

/// Append-mostly log of transaction records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn save(&self, transaction: &TransactionRecord) -> Result<TransactionRecord>;

    async fn find_by_id(&self, transaction_id: &str) -> Result<Option<TransactionRecord>>;
}
