use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Account, TransactionRecord, TransactionResult, TransactionType};

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            error_message: error_message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<ValidationErrorDetail>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Validation error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    pub user_id: i64,
    pub account_number: String,
    pub registered_at: DateTime<Utc>,
}

impl From<Account> for CreateAccountResponse {
    fn from(account: Account) -> Self {
        Self {
            user_id: account.account_user_id,
            account_number: account.account_number,
            registered_at: account.registered_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAccountResponse {
    pub user_id: i64,
    pub account_number: String,
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl From<Account> for DeleteAccountResponse {
    fn from(account: Account) -> Self {
        Self {
            user_id: account.account_user_id,
            account_number: account.account_number,
            unregistered_at: account.unregistered_at,
        }
    }
}

/// One entry in a user's account list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_number: String,
    pub balance: i64,
}

impl From<Account> for AccountInfo {
    fn from(account: Account) -> Self {
        Self {
            account_number: account.account_number,
            balance: account.balance,
        }
    }
}

/// Result of a use or cancel operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceTransactionResponse {
    pub account_number: String,
    pub transaction_result: TransactionResult,
    pub transaction_id: String,
    pub amount: i64,
    pub transacted_at: DateTime<Utc>,
}

impl From<TransactionRecord> for BalanceTransactionResponse {
    fn from(tx: TransactionRecord) -> Self {
        Self {
            account_number: tx.account_number,
            transaction_result: tx.result,
            transaction_id: tx.transaction_id,
            amount: tx.amount,
            transacted_at: tx.transacted_at,
        }
    }
}

pub type UseBalanceResponse = BalanceTransactionResponse;
pub type CancelBalanceResponse = BalanceTransactionResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTransactionResponse {
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub transaction_result: TransactionResult,
    pub transaction_id: String,
    pub amount: i64,
    pub transacted_at: DateTime<Utc>,
}

impl From<TransactionRecord> for QueryTransactionResponse {
    fn from(tx: TransactionRecord) -> Self {
        Self {
            account_number: tx.account_number,
            transaction_type: tx.transaction_type,
            transaction_result: tx.result,
            transaction_id: tx.transaction_id,
            amount: tx.amount,
            transacted_at: tx.transacted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_string(&ErrorResponse::new(
            "AMOUNT_EXCEED_BALANCE",
            "Amount exceeds the account balance",
        ))
        .unwrap();
        assert!(json.contains("\"error_code\":\"AMOUNT_EXCEED_BALANCE\""));
        assert!(json.contains("\"error_message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_query_response_carries_type_and_result() {
        let tx = TransactionRecord::failure("1000000000", TransactionType::Cancel, 100, 500);
        let json = serde_json::to_string(&QueryTransactionResponse::from(tx)).unwrap();
        assert!(json.contains("\"transaction_type\":\"CANCEL\""));
        assert!(json.contains("\"transaction_result\":\"FAIL\""));
    }
}
