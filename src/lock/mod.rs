pub mod coordinator;
pub mod memory_backend;
pub mod redis_backend;

pub use coordinator::{LockBackend, LockCoordinator, LockGuard, LockHandle};
pub use memory_backend::InMemoryLockBackend;
pub use redis_backend::RedisLockBackend;
