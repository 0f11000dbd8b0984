use std::sync::Arc;

use crate::error::{AccountError, AppError, ErrorCode, Result};
use crate::models::{Account, AccountUser};
use crate::observability::mask_account_number;
use crate::repositories::AccountStore;

/// A user may not own more accounts than this.
pub const MAX_ACCOUNTS_PER_USER: i64 = 10;

/// Request to open a new account.
#[derive(Debug, Clone)]
pub struct CreateAccountRequest {
    pub user_id: i64,
    pub initial_balance: i64,
}

/// Request to unregister an account.
#[derive(Debug, Clone)]
pub struct DeleteAccountRequest {
    pub user_id: i64,
    pub account_number: String,
}

/// Service for account lifecycle operations.
pub struct AccountService {
    account_store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(account_store: Arc<dyn AccountStore>) -> Self {
        Self { account_store }
    }

    /// Opens an account with the next free account number.
    pub async fn create_account(&self, request: CreateAccountRequest) -> Result<Account> {
        if request.initial_balance < 0 {
            return Err(AppError::Validation(
                "Initial balance cannot be negative".to_string(),
            ));
        }

        let user = self.find_user(request.user_id).await?;

        let owned = self.account_store.count_accounts_by_user(user.id).await?;
        if owned >= MAX_ACCOUNTS_PER_USER {
            return Err(AccountError::with_message(
                ErrorCode::MaxAccountPerUser10,
                format!("User {} already owns {} accounts", user.id, owned),
            )
            .into());
        }

        let last = self.account_store.last_account_number().await?;
        let account_number = Account::next_account_number(last.as_deref())?;

        let account = Account::new(user.id, account_number, request.initial_balance);
        let created = self.account_store.insert_account(&account).await?;

        tracing::info!(
            user_id = user.id,
            account_number = %mask_account_number(&created.account_number),
            "Account created"
        );

        Ok(created)
    }

    /// Unregisters an empty account owned by the user.
    pub async fn delete_account(&self, request: DeleteAccountRequest) -> Result<Account> {
        let user = self.find_user(request.user_id).await?;

        let mut account = self
            .account_store
            .find_account(&request.account_number)
            .await?
            .ok_or_else(|| {
                AccountError::with_message(
                    ErrorCode::AccountNotFound,
                    format!("Account {} not found", request.account_number),
                )
            })?;

        if !account.is_owned_by(user.id) {
            return Err(AppError::account(ErrorCode::UserAccountUnmatch));
        }
        if !account.status.is_in_use() {
            return Err(AppError::account(ErrorCode::AccountAlreadyUnregistered));
        }
        if account.balance != 0 {
            return Err(AccountError::with_message(
                ErrorCode::BalanceNotEmpty,
                format!(
                    "Account {} still holds {}",
                    account.account_number, account.balance
                ),
            )
            .into());
        }

        account.unregister();
        let unregistered = self
            .account_store
            .unregister_account(&account)
            .await?
            .ok_or_else(|| AppError::account(ErrorCode::AccountNotFound))?;

        tracing::info!(
            user_id = user.id,
            account_number = %mask_account_number(&unregistered.account_number),
            "Account unregistered"
        );

        Ok(unregistered)
    }

    /// Lists every account of the user, unregistered ones included.
    pub async fn get_accounts_by_user(&self, user_id: i64) -> Result<Vec<Account>> {
        let user = self.find_user(user_id).await?;
        self.account_store.find_accounts_by_user(user.id).await
    }

    async fn find_user(&self, user_id: i64) -> Result<AccountUser> {
        self.account_store
            .find_user(user_id)
            .await?
            .ok_or_else(|| {
                AppError::Account(AccountError::with_message(
                    ErrorCode::UserNotFound,
                    format!("User {} not found", user_id),
                ))
            })
    }
}
