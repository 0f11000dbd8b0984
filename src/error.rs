use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Business error kinds surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UserNotFound,
    AccountNotFound,
    UserAccountUnmatch,
    AccountAlreadyUnregistered,
    AmountExceedBalance,
    TransactionNotFound,
    TransactionAccountUnmatch,
    CancelMustFully,
    TooOldToCancel,
    LockAcquisitionTimeout,
    #[serde(rename = "MAX_ACCOUNT_PER_USER_10")]
    MaxAccountPerUser10,
    BalanceNotEmpty,
    InvalidRequest,
    InternalServerError,
}

impl ErrorCode {
    /// Default message used when an error is raised without extra context.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::AccountNotFound => "Account not found",
            ErrorCode::UserAccountUnmatch => "Account does not belong to the user",
            ErrorCode::AccountAlreadyUnregistered => "Account is already unregistered",
            ErrorCode::AmountExceedBalance => "Amount exceeds the account balance",
            ErrorCode::TransactionNotFound => "Transaction not found",
            ErrorCode::TransactionAccountUnmatch => "Transaction does not belong to the account",
            ErrorCode::CancelMustFully => "Partial cancellation is not allowed",
            ErrorCode::TooOldToCancel => "Transactions older than one year cannot be cancelled",
            ErrorCode::LockAcquisitionTimeout => "Account is in use by another request",
            ErrorCode::MaxAccountPerUser10 => "A user can own at most 10 accounts",
            ErrorCode::BalanceNotEmpty => "Account balance must be empty",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InternalServerError => "Internal server error",
        }
    }

    /// Stable wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorCode::UserAccountUnmatch => "USER_ACCOUNT_UNMATCH",
            ErrorCode::AccountAlreadyUnregistered => "ACCOUNT_ALREADY_UNREGISTERED",
            ErrorCode::AmountExceedBalance => "AMOUNT_EXCEED_BALANCE",
            ErrorCode::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            ErrorCode::TransactionAccountUnmatch => "TRANSACTION_ACCOUNT_UNMATCH",
            ErrorCode::CancelMustFully => "CANCEL_MUST_FULLY",
            ErrorCode::TooOldToCancel => "TOO_OLD_TO_CANCEL",
            ErrorCode::LockAcquisitionTimeout => "LOCK_ACQUISITION_TIMEOUT",
            ErrorCode::MaxAccountPerUser10 => "MAX_ACCOUNT_PER_USER_10",
            ErrorCode::BalanceNotEmpty => "BALANCE_NOT_EMPTY",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed business-rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct AccountError {
    pub code: ErrorCode,
    pub message: String,
}

impl AccountError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.description().to_string(),
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Lock timeouts happen before any state is read, so they are never audited.
    pub fn is_auditable(&self) -> bool {
        self.code != ErrorCode::LockAcquisitionTimeout
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn account(code: ErrorCode) -> Self {
        AppError::Account(AccountError::new(code))
    }

    /// Returns the business error code, if this is a business failure.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::Account(e) => Some(e.code),
            _ => None,
        }
    }

    /// True for business-rule failures that must leave an audit row behind.
    pub fn is_auditable(&self) -> bool {
        matches!(self, AppError::Account(e) if e.is_auditable())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_names_match_serde() {
        for code in [
            ErrorCode::UserNotFound,
            ErrorCode::CancelMustFully,
            ErrorCode::LockAcquisitionTimeout,
            ErrorCode::MaxAccountPerUser10,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_lock_timeout_is_not_auditable() {
        assert!(!AppError::account(ErrorCode::LockAcquisitionTimeout).is_auditable());
        assert!(AppError::account(ErrorCode::AmountExceedBalance).is_auditable());
        assert!(!AppError::Validation("bad".to_string()).is_auditable());
    }

    #[test]
    fn test_account_error_display() {
        let err = AccountError::with_message(ErrorCode::AccountNotFound, "no account 1000000000");
        assert_eq!(err.to_string(), "ACCOUNT_NOT_FOUND: no account 1000000000");
        assert_eq!(AppError::from(err).code(), Some(ErrorCode::AccountNotFound));
    }
}
