pub mod account_lock;
pub mod account_service;
pub mod failure_recorder;
pub mod transaction_handler;
pub mod transaction_service;

pub use account_lock::with_account_lock;
pub use account_service::{AccountService, CreateAccountRequest, DeleteAccountRequest};
pub use failure_recorder::FailureRecorder;
pub use transaction_handler::{CancelBalanceRequest, TransactionHandler, UseBalanceRequest};
pub use transaction_service::TransactionService;
