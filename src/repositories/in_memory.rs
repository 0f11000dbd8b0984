use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{Account, AccountUser, TransactionRecord};
use crate::repositories::{AccountStore, TransactionStore};

#[derive(Default)]
struct AccountTables {
    users: HashMap<i64, AccountUser>,
    accounts: HashMap<String, Account>,
    next_account_id: i64,
    last_account_number: Option<String>,
}

/// A thread-safe in-memory [`AccountStore`].
///
/// Cloning shares the underlying tables, so one instance can be handed to
/// several services at once. Applied transactions are appended to the
/// attached [`InMemoryTransactionStore`].
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    tables: Arc<RwLock<AccountTables>>,
    journal: InMemoryTransactionStore,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose applied transactions land in `transactions`.
    pub fn with_transactions(transactions: InMemoryTransactionStore) -> Self {
        Self {
            tables: Arc::default(),
            journal: transactions,
        }
    }

    pub async fn insert_user(&self, user: AccountUser) {
        let mut tables = self.tables.write().await;
        tables.users.insert(user.id, user);
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_user(&self, user_id: i64) -> Result<Option<AccountUser>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&user_id).cloned())
    }

    async fn find_account(&self, account_number: &str) -> Result<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.get(account_number).cloned())
    }

    async fn apply_transaction(
        &self,
        transaction: &TransactionRecord,
    ) -> Result<Option<TransactionRecord>> {
        // Lock order: account tables, then the journal.
        let mut tables = self.tables.write().await;
        let Some(account) = tables.accounts.get_mut(&transaction.account_number) else {
            return Ok(None);
        };

        let mut journal = self.journal.transactions.write().await;
        journal.push(transaction.clone());
        account.balance = transaction.balance_snapshot;
        account.updated_at = Utc::now();

        Ok(Some(transaction.clone()))
    }

    async fn insert_account(&self, account: &Account) -> Result<Account> {
        let mut tables = self.tables.write().await;
        tables.next_account_id += 1;

        let mut stored = account.clone();
        stored.id = tables.next_account_id;
        tables.last_account_number = Some(stored.account_number.clone());
        tables
            .accounts
            .insert(stored.account_number.clone(), stored.clone());

        Ok(stored)
    }

    async fn last_account_number(&self) -> Result<Option<String>> {
        let tables = self.tables.read().await;
        Ok(tables.last_account_number.clone())
    }

    async fn count_accounts_by_user(&self, user_id: i64) -> Result<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .accounts
            .values()
            .filter(|a| a.account_user_id == user_id)
            .count();
        Ok(count as i64)
    }

    async fn find_accounts_by_user(&self, user_id: i64) -> Result<Vec<Account>> {
        let tables = self.tables.read().await;
        let mut accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|a| a.account_user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn unregister_account(&self, account: &Account) -> Result<Option<Account>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .accounts
            .get_mut(&account.account_number)
            .map(|stored| {
                stored.status = account.status;
                stored.unregistered_at = account.unregistered_at;
                stored.updated_at = Utc::now();
                stored.clone()
            }))
    }
}

/// A thread-safe in-memory [`TransactionStore`].
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<Vec<TransactionRecord>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records for an account in insertion order.
    pub async fn find_by_account(&self, account_number: &str) -> Vec<TransactionRecord> {
        let transactions = self.transactions.read().await;
        transactions
            .iter()
            .filter(|tx| tx.belongs_to(account_number))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn save(&self, transaction: &TransactionRecord) -> Result<TransactionRecord> {
        let mut transactions = self.transactions.write().await;
        transactions.push(transaction.clone());
        Ok(transaction.clone())
    }

    async fn find_by_id(&self, transaction_id: &str) -> Result<Option<TransactionRecord>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .find(|tx| tx.transaction_id == transaction_id)
            .cloned())
    }
}
