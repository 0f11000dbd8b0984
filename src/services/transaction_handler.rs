use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::lock::LockCoordinator;
use crate::models::{TransactionRecord, TransactionType};
use crate::observability::{get_metrics, mask_account_number, mask_amount, LatencyTimer};
use crate::services::account_lock::with_account_lock;
use crate::services::{FailureRecorder, TransactionService};

/// Request to place a hold on an account balance.
#[derive(Debug, Clone)]
pub struct UseBalanceRequest {
    pub user_id: i64,
    pub account_number: String,
    pub amount: i64,
}

/// Request to reverse a previous use in full.
#[derive(Debug, Clone)]
pub struct CancelBalanceRequest {
    pub transaction_id: String,
    pub account_number: String,
    pub amount: i64,
}

/// Entry point for balance operations.
///
/// Mutations run under the account lock. Business failures are audited as a
/// FAIL record before the lock is released, then returned unchanged.
pub struct TransactionHandler {
    locks: LockCoordinator,
    engine: Arc<TransactionService>,
    recorder: FailureRecorder,
}

impl TransactionHandler {
    pub fn new(
        locks: LockCoordinator,
        engine: Arc<TransactionService>,
        recorder: FailureRecorder,
    ) -> Self {
        Self {
            locks,
            engine,
            recorder,
        }
    }

    pub async fn use_balance(&self, request: UseBalanceRequest) -> Result<TransactionRecord> {
        let timer = LatencyTimer::new();
        tracing::info!(
            user_id = request.user_id,
            account_number = %mask_account_number(&request.account_number),
            amount = %mask_amount(request.amount),
            "Use balance requested"
        );

        let result = with_account_lock(
            &self.locks,
            request,
            |r| r.account_number.as_str(),
            |r| async move {
                match self
                    .engine
                    .use_balance(r.user_id, &r.account_number, r.amount)
                    .await
                {
                    Ok(tx) => Ok(tx),
                    Err(e) => Err(self
                        .audit_failure(e, &r.account_number, r.amount, TransactionType::Use)
                        .await),
                }
            },
        )
        .await;

        self.finish(TransactionType::Use, &result, &timer);
        result
    }

    pub async fn cancel_balance(&self, request: CancelBalanceRequest) -> Result<TransactionRecord> {
        let timer = LatencyTimer::new();
        tracing::info!(
            transaction_id = %request.transaction_id,
            account_number = %mask_account_number(&request.account_number),
            amount = %mask_amount(request.amount),
            "Cancel balance requested"
        );

        let result = with_account_lock(
            &self.locks,
            request,
            |r| r.account_number.as_str(),
            |r| async move {
                match self
                    .engine
                    .cancel_balance(&r.transaction_id, &r.account_number, r.amount)
                    .await
                {
                    Ok(tx) => Ok(tx),
                    Err(e) => Err(self
                        .audit_failure(e, &r.account_number, r.amount, TransactionType::Cancel)
                        .await),
                }
            },
        )
        .await;

        self.finish(TransactionType::Cancel, &result, &timer);
        result
    }

    /// Read-only; does not take the account lock.
    pub async fn query_transaction(&self, transaction_id: &str) -> Result<TransactionRecord> {
        self.engine.query_transaction(transaction_id).await
    }

    /// Writes the FAIL record for an auditable error and returns the error the
    /// caller should see. A failed audit write replaces the business error.
    async fn audit_failure(
        &self,
        error: AppError,
        account_number: &str,
        amount: i64,
        transaction_type: TransactionType,
    ) -> AppError {
        if !error.is_auditable() {
            return error;
        }

        tracing::warn!(
            account_number = %mask_account_number(account_number),
            transaction_type = transaction_type.as_str(),
            error = %error,
            "Balance operation rejected"
        );

        match self
            .recorder
            .record(account_number, amount, transaction_type)
            .await
        {
            Ok(_) => error,
            Err(audit_error) => {
                tracing::error!(
                    account_number = %mask_account_number(account_number),
                    original_error = %error,
                    audit_error = %audit_error,
                    "Failed to write failure record"
                );
                audit_error
            }
        }
    }

    fn finish(
        &self,
        transaction_type: TransactionType,
        result: &Result<TransactionRecord>,
        timer: &LatencyTimer,
    ) {
        let metrics = get_metrics();
        metrics.record_operation_latency(transaction_type.as_str(), timer.elapsed_ms());

        match result {
            Ok(tx) => {
                metrics.record_transaction(transaction_type.as_str(), tx.result.as_str());
            }
            Err(e) => {
                let code = e.code().map(|c| c.as_str()).unwrap_or("INTERNAL_SERVER_ERROR");
                metrics.record_transaction_rejected(transaction_type.as_str(), code);
            }
        }
    }
}
