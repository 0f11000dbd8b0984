use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::Result;
use crate::lock::LockBackend;

#[derive(Debug, Clone)]
struct Lease {
    token: String,
    expires_at: Instant,
}

/// Process-local lock backend with the same lease semantics as Redis.
///
/// Only serializes callers inside one process; use [`RedisLockBackend`](super::RedisLockBackend)
/// when more than one instance serves the same accounts.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLockBackend {
    leases: Arc<Mutex<HashMap<String, Lease>>>,
}

impl InMemoryLockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` currently has a live lease.
    pub async fn is_locked(&self, key: &str) -> bool {
        let leases = self.leases.lock().await;
        leases
            .get(key)
            .map(|lease| lease.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

#[async_trait]
impl LockBackend for InMemoryLockBackend {
    async fn try_lock(&self, key: &str, token: &str, lease: Duration) -> Result<bool> {
        let mut leases = self.leases.lock().await;
        let now = Instant::now();

        if let Some(existing) = leases.get(key) {
            if existing.expires_at > now {
                return Ok(false);
            }
        }

        leases.insert(
            key.to_string(),
            Lease {
                token: token.to_string(),
                expires_at: now + lease,
            },
        );
        Ok(true)
    }

    async fn unlock(&self, key: &str, token: &str) -> Result<bool> {
        let mut leases = self.leases.lock().await;
        match leases.get(key) {
            Some(lease) if lease.token == token => {
                leases.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_exclusive_until_released() {
        tokio_test::block_on(async {
            let backend = InMemoryLockBackend::new();
            let lease = Duration::from_secs(10);

            assert!(backend.try_lock("k", "a", lease).await.unwrap());
            assert!(!backend.try_lock("k", "b", lease).await.unwrap());
            assert!(backend.try_lock("other", "b", lease).await.unwrap());

            assert!(backend.unlock("k", "a").await.unwrap());
            assert!(backend.try_lock("k", "b", lease).await.unwrap());
        });
    }

    #[test]
    fn test_unlock_with_foreign_token_is_noop() {
        tokio_test::block_on(async {
            let backend = InMemoryLockBackend::new();
            backend
                .try_lock("k", "owner", Duration::from_secs(10))
                .await
                .unwrap();

            assert!(!backend.unlock("k", "intruder").await.unwrap());
            assert!(backend.is_locked("k").await);
            assert!(backend.unlock("k", "owner").await.unwrap());
            assert!(!backend.unlock("k", "owner").await.unwrap());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_lease_expires() {
        let backend = InMemoryLockBackend::new();
        backend
            .try_lock("k", "crashed", Duration::from_millis(100))
            .await
            .unwrap();
        assert!(!backend.try_lock("k", "next", Duration::from_millis(100)).await.unwrap());

        tokio::time::advance(Duration::from_millis(150)).await;

        assert!(!backend.is_locked("k").await);
        assert!(backend.try_lock("k", "next", Duration::from_millis(100)).await.unwrap());
        assert!(!backend.unlock("k", "crashed").await.unwrap());
    }
}
