use std::sync::Arc;

use crate::error::Result;
use crate::models::{TransactionRecord, TransactionType};
use crate::observability::{get_metrics, mask_account_number};
use crate::repositories::{AccountStore, TransactionStore};

/// Writes a FAIL record for a rejected balance operation.
///
/// Must run while the caller still holds the account lock so the captured
/// balance is consistent with the rejection.
pub struct FailureRecorder {
    account_store: Arc<dyn AccountStore>,
    transaction_store: Arc<dyn TransactionStore>,
}

impl FailureRecorder {
    pub fn new(
        account_store: Arc<dyn AccountStore>,
        transaction_store: Arc<dyn TransactionStore>,
    ) -> Self {
        Self {
            account_store,
            transaction_store,
        }
    }

    /// Records the failed attempt. Returns `Ok(None)` when the account does
    /// not exist, since there is no balance to snapshot.
    pub async fn record(
        &self,
        account_number: &str,
        amount: i64,
        transaction_type: TransactionType,
    ) -> Result<Option<TransactionRecord>> {
        let Some(account) = self.account_store.find_account(account_number).await? else {
            tracing::debug!(
                account_number = %mask_account_number(account_number),
                "No account to attach failure record to"
            );
            get_metrics().record_failure_audit(transaction_type.as_str(), false);
            return Ok(None);
        };

        let record = TransactionRecord::failure(
            &account.account_number,
            transaction_type,
            amount,
            account.balance,
        );
        let saved = self.transaction_store.save(&record).await?;

        get_metrics().record_failure_audit(transaction_type.as_str(), true);
        get_metrics().record_transaction(transaction_type.as_str(), saved.result.as_str());
        tracing::info!(
            transaction_id = %saved.transaction_id,
            account_number = %mask_account_number(&saved.account_number),
            transaction_type = transaction_type.as_str(),
            "Failure record written"
        );

        Ok(Some(saved))
    }
}
