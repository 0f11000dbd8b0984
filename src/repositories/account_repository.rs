use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::{Account, AccountUser, TransactionRecord};
use crate::repositories::transaction_repository::insert_transaction;
use crate::repositories::AccountStore;

const ACCOUNT_COLUMNS: &str = "id, account_number, account_user_id, status, balance, registered_at, unregistered_at, created_at, updated_at";

/// PostgreSQL-backed [`AccountStore`].
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a user. Users are normally provisioned outside this service.
    pub async fn create_user(&self, name: &str) -> Result<AccountUser> {
        let row = sqlx::query_as::<_, AccountUser>(
            r#"
            INSERT INTO account_users (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find_user(&self, user_id: i64) -> Result<Option<AccountUser>> {
        let row = sqlx::query_as::<_, AccountUser>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM account_users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    async fn find_account(&self, account_number: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1"
        ))
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    async fn apply_transaction(
        &self,
        transaction: &TransactionRecord,
    ) -> Result<Option<TransactionRecord>> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $2, updated_at = NOW()
            WHERE account_number = $1
            "#,
        )
        .bind(&transaction.account_number)
        .bind(transaction.balance_snapshot)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(AppError::Database)?;
            return Ok(None);
        }

        let saved = insert_transaction(&mut *tx, transaction).await?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(saved))
    }

    async fn insert_account(&self, account: &Account) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (account_number, account_user_id, status, balance, registered_at, unregistered_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&account.account_number)
        .bind(account.account_user_id)
        .bind(account.status)
        .bind(account.balance)
        .bind(account.registered_at)
        .bind(account.unregistered_at)
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    async fn last_account_number(&self) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT account_number
            FROM accounts
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(|(number,)| number))
    }

    async fn count_accounts_by_user(&self, user_id: i64) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM accounts
            WHERE account_user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    async fn find_accounts_by_user(&self, user_id: i64) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    async fn unregister_account(&self, account: &Account) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET status = $2, unregistered_at = $3, updated_at = NOW()
            WHERE account_number = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&account.account_number)
        .bind(account.status)
        .bind(account.unregistered_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
