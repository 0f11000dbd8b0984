use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

use crate::error::{AppError, Result};
use crate::models::TransactionRecord;
use crate::repositories::TransactionStore;

/// Inserts one record through `executor`, which may be the pool or an open
/// database transaction.
pub(crate) async fn insert_transaction<'e, E>(
    executor: E,
    transaction: &TransactionRecord,
) -> Result<TransactionRecord>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, TransactionRecord>(
        r#"
        INSERT INTO transactions (transaction_id, account_number, transaction_type, result, amount, balance_snapshot, transacted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING transaction_id, account_number, transaction_type, result, amount, balance_snapshot, transacted_at
        "#,
    )
    .bind(&transaction.transaction_id)
    .bind(&transaction.account_number)
    .bind(transaction.transaction_type)
    .bind(transaction.result)
    .bind(transaction.amount)
    .bind(transaction.balance_snapshot)
    .bind(transaction.transacted_at)
    .fetch_one(executor)
    .await
    .map_err(AppError::Database)?;

    Ok(row)
}

/// PostgreSQL-backed [`TransactionStore`].
#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists the transactions of an account, newest first.
    pub async fn find_by_account(
        &self,
        account_number: &str,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT transaction_id, account_number, transaction_type, result, amount, balance_snapshot, transacted_at
            FROM transactions
            WHERE account_number = $1
            ORDER BY transacted_at DESC
            LIMIT $2
            "#,
        )
        .bind(account_number)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}

#[async_trait]
impl TransactionStore for TransactionRepository {
    async fn save(&self, transaction: &TransactionRecord) -> Result<TransactionRecord> {
        insert_transaction(&self.pool, transaction).await
    }

    async fn find_by_id(&self, transaction_id: &str) -> Result<Option<TransactionRecord>> {
        let row = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT transaction_id, account_number, transaction_type, result, amount, balance_snapshot, transacted_at
            FROM transactions
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
