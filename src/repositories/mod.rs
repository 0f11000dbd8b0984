pub mod account_repository;
pub mod in_memory;
pub mod store;
pub mod transaction_repository;

pub use account_repository::AccountRepository;
pub use in_memory::{InMemoryAccountStore, InMemoryTransactionStore};
pub use store::{AccountStore, TransactionStore};
pub use transaction_repository::TransactionRepository;

#[cfg(test)]
pub use store::{MockAccountStore, MockTransactionStore};
