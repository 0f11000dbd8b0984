use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Account numbers are exactly ten ASCII digits.
fn validate_account_number(value: &str) -> Result<(), ValidationError> {
    if value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        let mut error = ValidationError::new("account_number");
        error.message = Some("account_number must be exactly 10 digits".into());
        Err(error)
    }
}

/// Request to open a new account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(range(min = 1, message = "user_id must be at least 1"))]
    pub user_id: i64,
    #[validate(range(min = 0, message = "initial_balance cannot be negative"))]
    pub initial_balance: i64,
}

/// Request to unregister an account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeleteAccountRequest {
    #[validate(range(min = 1, message = "user_id must be at least 1"))]
    pub user_id: i64,
    #[validate(custom = "validate_account_number")]
    pub account_number: String,
}

/// Query parameters for listing a user's accounts.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListAccountsQuery {
    #[validate(range(min = 1, message = "user_id must be at least 1"))]
    pub user_id: i64,
}

/// Request to use part of an account balance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UseBalanceRequest {
    #[validate(range(min = 1, message = "user_id must be at least 1"))]
    pub user_id: i64,
    #[validate(custom = "validate_account_number")]
    pub account_number: String,
    #[validate(range(min = 10, max = 1000000000, message = "amount must be between 10 and 1000000000"))]
    pub amount: i64,
}

/// Request to cancel a previous use.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelBalanceRequest {
    #[validate(length(min = 1, message = "transaction_id cannot be empty"))]
    pub transaction_id: String,
    #[validate(custom = "validate_account_number")]
    pub account_number: String,
    #[validate(range(min = 10, max = 1000000000, message = "amount must be between 10 and 1000000000"))]
    pub amount: i64,
}

impl From<UseBalanceRequest> for crate::services::UseBalanceRequest {
    fn from(request: UseBalanceRequest) -> Self {
        Self {
            user_id: request.user_id,
            account_number: request.account_number,
            amount: request.amount,
        }
    }
}

impl From<CancelBalanceRequest> for crate::services::CancelBalanceRequest {
    fn from(request: CancelBalanceRequest) -> Self {
        Self {
            transaction_id: request.transaction_id,
            account_number: request.account_number,
            amount: request.amount,
        }
    }
}

impl From<CreateAccountRequest> for crate::services::CreateAccountRequest {
    fn from(request: CreateAccountRequest) -> Self {
        Self {
            user_id: request.user_id,
            initial_balance: request.initial_balance,
        }
    }
}

impl From<DeleteAccountRequest> for crate::services::DeleteAccountRequest {
    fn from(request: DeleteAccountRequest) -> Self {
        Self {
            user_id: request.user_id,
            account_number: request.account_number,
        }
    }
}
