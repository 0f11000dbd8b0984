use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::TransactionSettings;
use crate::error::{AccountError, AppError, ErrorCode, Result};
use crate::models::{Account, AccountUser, TransactionRecord, TransactionType};
use crate::repositories::{AccountStore, TransactionStore};

/// Validates and executes balance operations against the stores.
///
/// Callers must hold the account lock for the duration of `use_balance` and
/// `cancel_balance`; this type performs no locking of its own.
pub struct TransactionService {
    account_store: Arc<dyn AccountStore>,
    transaction_store: Arc<dyn TransactionStore>,
    settings: TransactionSettings,
}

impl TransactionService {
    pub fn new(
        account_store: Arc<dyn AccountStore>,
        transaction_store: Arc<dyn TransactionStore>,
    ) -> Self {
        Self::with_settings(account_store, transaction_store, TransactionSettings::default())
    }

    pub fn with_settings(
        account_store: Arc<dyn AccountStore>,
        transaction_store: Arc<dyn TransactionStore>,
        settings: TransactionSettings,
    ) -> Self {
        Self {
            account_store,
            transaction_store,
            settings,
        }
    }

    pub fn settings(&self) -> &TransactionSettings {
        &self.settings
    }

    /// Places a hold of `amount` on the account.
    ///
    /// Checks, in order: user exists, account exists, account belongs to the
    /// user, account is in use, amount fits the balance.
    pub async fn use_balance(
        &self,
        user_id: i64,
        account_number: &str,
        amount: i64,
    ) -> Result<TransactionRecord> {
        self.check_amount(amount)?;

        let user = self
            .account_store
            .find_user(user_id)
            .await?
            .ok_or_else(|| {
                AccountError::with_message(
                    ErrorCode::UserNotFound,
                    format!("User {} not found", user_id),
                )
            })?;

        let mut account = self.find_account(account_number).await?;
        validate_use_balance(&user, &account, amount)?;

        account.use_balance(amount)?;
        let transaction = TransactionRecord::success(
            &account.account_number,
            TransactionType::Use,
            amount,
            account.balance,
        );

        self.apply(transaction).await
    }

    /// Reverses a previous transaction in full.
    ///
    /// Checks, in order: transaction exists, account exists, transaction
    /// belongs to the account, amount equals the original, transaction is
    /// inside the cancellation window.
    pub async fn cancel_balance(
        &self,
        transaction_id: &str,
        account_number: &str,
        amount: i64,
    ) -> Result<TransactionRecord> {
        self.check_amount(amount)?;

        let original = self.find_transaction(transaction_id).await?;
        let mut account = self.find_account(account_number).await?;
        validate_cancel_balance(
            &original,
            &account,
            amount,
            Utc::now(),
            self.settings.cancel_window_months,
        )?;

        account.cancel_balance(amount)?;
        let transaction = TransactionRecord::success(
            &account.account_number,
            TransactionType::Cancel,
            amount,
            account.balance,
        );

        self.apply(transaction).await
    }

    /// Returns a stored transaction as-is, including failed and cancel records.
    pub async fn query_transaction(&self, transaction_id: &str) -> Result<TransactionRecord> {
        self.find_transaction(transaction_id).await
    }

    async fn find_account(&self, account_number: &str) -> Result<Account> {
        self.account_store
            .find_account(account_number)
            .await?
            .ok_or_else(|| {
                AppError::Account(AccountError::with_message(
                    ErrorCode::AccountNotFound,
                    format!("Account {} not found", account_number),
                ))
            })
    }

    async fn find_transaction(&self, transaction_id: &str) -> Result<TransactionRecord> {
        self.transaction_store
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| {
                AppError::Account(AccountError::with_message(
                    ErrorCode::TransactionNotFound,
                    format!("Transaction {} not found", transaction_id),
                ))
            })
    }

    /// Persists the record and moves the stored balance to its snapshot in
    /// one store write.
    async fn apply(&self, transaction: TransactionRecord) -> Result<TransactionRecord> {
        let saved = self
            .account_store
            .apply_transaction(&transaction)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "Account {} disappeared while locked",
                    transaction.account_number
                ))
            })?;

        tracing::info!(
            transaction_type = transaction.transaction_type.as_str(),
            transaction_id = %transaction.transaction_id,
            amount = transaction.amount,
            balance_snapshot = transaction.balance_snapshot,
            "Balance transaction applied"
        );

        Ok(saved)
    }

    fn check_amount(&self, amount: i64) -> Result<()> {
        if amount <= 0 {
            return Err(AppError::Validation("amount must be positive".to_string()));
        }
        if amount < self.settings.min_amount || amount > self.settings.max_amount {
            return Err(AppError::Validation(format!(
                "amount must be between {} and {}",
                self.settings.min_amount, self.settings.max_amount
            )));
        }
        Ok(())
    }
}

fn validate_use_balance(
    user: &AccountUser,
    account: &Account,
    amount: i64,
) -> std::result::Result<(), AccountError> {
    if !account.is_owned_by(user.id) {
        return Err(AccountError::with_message(
            ErrorCode::UserAccountUnmatch,
            format!(
                "Account {} does not belong to user {}",
                account.account_number, user.id
            ),
        ));
    }
    if !account.status.is_in_use() {
        return Err(AccountError::with_message(
            ErrorCode::AccountAlreadyUnregistered,
            format!("Account {} is unregistered", account.account_number),
        ));
    }
    account.balance_after_use(amount).map(|_| ())
}

fn validate_cancel_balance(
    original: &TransactionRecord,
    account: &Account,
    amount: i64,
    now: DateTime<Utc>,
    window_months: u32,
) -> std::result::Result<(), AccountError> {
    if !original.belongs_to(&account.account_number) {
        return Err(AccountError::with_message(
            ErrorCode::TransactionAccountUnmatch,
            format!(
                "Transaction {} does not belong to account {}",
                original.transaction_id, account.account_number
            ),
        ));
    }
    if amount != original.amount {
        return Err(AccountError::with_message(
            ErrorCode::CancelMustFully,
            format!(
                "Cancel amount {} must equal the original amount {}",
                amount, original.amount
            ),
        ));
    }
    if !original.is_cancellable_at(now, window_months) {
        return Err(AccountError::with_message(
            ErrorCode::TooOldToCancel,
            format!(
                "Transaction {} is older than {} months",
                original.transaction_id, window_months
            ),
        ));
    }
    Ok(())
}
