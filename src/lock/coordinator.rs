use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::LockSettings;
use crate::error::{AccountError, AppError, ErrorCode, Result};
use crate::observability::{get_metrics, mask_sensitive, LatencyTimer};

/// Storage primitive behind the [`LockCoordinator`].
///
/// Implementations must make `try_lock` atomic per key and must only remove a
/// lease in `unlock` when it is still held under `token`.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Takes the lease on `key` if nobody holds a live one.
    async fn try_lock(&self, key: &str, token: &str, lease: Duration) -> Result<bool>;

    /// Drops the lease on `key` if it is held under `token`.
    async fn unlock(&self, key: &str, token: &str) -> Result<bool>;
}

/// Proof of a granted lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    pub key: String,
    pub token: String,
    pub lease: Duration,
    pub acquired_at: DateTime<Utc>,
}

/// Fleet-wide mutual exclusion keyed by account number.
#[derive(Clone)]
pub struct LockCoordinator {
    backend: Arc<dyn LockBackend>,
    settings: LockSettings,
}

impl LockCoordinator {
    pub fn new(backend: Arc<dyn LockBackend>, settings: LockSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    /// Backend key for an account number.
    pub fn lock_key(&self, account_number: &str) -> String {
        format!("{}:{}", self.settings.key_prefix, account_number)
    }

    /// Acquires the lock on `key`, retrying at the configured interval.
    ///
    /// Fails with `LockAcquisitionTimeout` once `wait_timeout` has elapsed.
    /// Dropping the returned future stops contending immediately.
    pub async fn acquire(
        &self,
        key: &str,
        wait_timeout: Duration,
        lease_timeout: Duration,
    ) -> Result<LockHandle> {
        let timer = LatencyTimer::new();
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + wait_timeout;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            if self.backend.try_lock(key, &token, lease_timeout).await? {
                get_metrics().record_lock_acquired(timer.elapsed_ms(), attempts);
                tracing::debug!(
                    lock_key = %mask_sensitive(key, 4),
                    attempts,
                    "Lock acquired"
                );
                return Ok(LockHandle {
                    key: key.to_string(),
                    token,
                    lease: lease_timeout,
                    acquired_at: Utc::now(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                get_metrics().record_lock_timeout(timer.elapsed_ms());
                tracing::warn!(
                    lock_key = %mask_sensitive(key, 4),
                    attempts,
                    wait_ms = wait_timeout.as_millis() as u64,
                    "Lock acquisition timed out"
                );
                return Err(AppError::Account(AccountError::with_message(
                    ErrorCode::LockAcquisitionTimeout,
                    format!(
                        "Could not lock {} within {} ms",
                        key,
                        wait_timeout.as_millis()
                    ),
                )));
            }

            tokio::time::sleep(self.settings.retry_interval().min(deadline - now)).await;
        }
    }

    /// Releases a lease. Safe to call twice or after the lease expired.
    pub async fn release(&self, handle: &LockHandle) -> Result<()> {
        let released = self.backend.unlock(&handle.key, &handle.token).await?;
        if released {
            tracing::debug!(lock_key = %mask_sensitive(&handle.key, 4), "Lock released");
        } else {
            tracing::debug!(
                lock_key = %mask_sensitive(&handle.key, 4),
                "Lock already released or expired"
            );
        }
        Ok(())
    }

    /// Acquires the lock for `account_number` with the configured timeouts and
    /// wraps the handle in a guard.
    pub async fn lock_account(&self, account_number: &str) -> Result<LockGuard> {
        let handle = self
            .acquire(
                &self.lock_key(account_number),
                self.settings.wait_timeout(),
                self.settings.lease_timeout(),
            )
            .await?;
        Ok(LockGuard {
            backend: Arc::clone(&self.backend),
            handle: Some(handle),
        })
    }

    /// Runs `operation` while holding the lock for `account_number`.
    ///
    /// The lock is released on every exit path: `Ok`, `Err`, or the future
    /// being dropped part-way (see [`LockGuard`]).
    pub async fn with_lock<T, F, Fut>(&self, account_number: &str, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = self.lock_account(account_number).await?;
        let result = operation().await;

        if let Err(e) = guard.release().await {
            // The lease still expires on its own.
            tracing::warn!("Failed to release account lock: {}", e);
        }

        result
    }
}

/// Scoped lock ownership.
///
/// Prefer [`LockGuard::release`]; if the guard is dropped while still holding
/// the lease, the release is spawned onto the current Tokio runtime.
pub struct LockGuard {
    backend: Arc<dyn LockBackend>,
    handle: Option<LockHandle>,
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl LockGuard {
    pub fn handle(&self) -> Option<&LockHandle> {
        self.handle.as_ref()
    }

    pub async fn release(mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            self.backend.unlock(&handle.key, &handle.token).await?;
            tracing::debug!(lock_key = %mask_sensitive(&handle.key, 4), "Lock released");
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let backend = Arc::clone(&self.backend);
                runtime.spawn(async move {
                    if let Err(e) = backend.unlock(&handle.key, &handle.token).await {
                        tracing::warn!("Deferred lock release failed: {}", e);
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    lock_key = %mask_sensitive(&handle.key, 4),
                    "No runtime to release lock; waiting for lease expiry"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::InMemoryLockBackend;

    fn coordinator(backend: InMemoryLockBackend, wait_ms: u64) -> LockCoordinator {
        LockCoordinator::new(
            Arc::new(backend),
            LockSettings {
                key_prefix: "test-lock".to_string(),
                wait_timeout_ms: wait_ms,
                lease_timeout_ms: 5_000,
                retry_interval_ms: 10,
            },
        )
    }

    #[test]
    fn test_lock_key_format() {
        let coordinator = coordinator(InMemoryLockBackend::new(), 100);
        assert_eq!(coordinator.lock_key("1000000000"), "test-lock:1000000000");
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let backend = InMemoryLockBackend::new();
        let coordinator = coordinator(backend.clone(), 100);

        let handle = coordinator
            .acquire("k", Duration::from_millis(100), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(backend.is_locked("k").await);

        coordinator.release(&handle).await.unwrap();
        coordinator.release(&handle).await.unwrap();
        assert!(!backend.is_locked("k").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_times_out() {
        let backend = InMemoryLockBackend::new();
        let coordinator = coordinator(backend.clone(), 100);
        let _held = coordinator
            .acquire("k", Duration::from_millis(100), Duration::from_secs(5))
            .await
            .unwrap();

        let err = coordinator
            .acquire("k", Duration::from_millis(100), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::LockAcquisitionTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_succeeds_after_lease_expiry() {
        let backend = InMemoryLockBackend::new();
        let coordinator = coordinator(backend.clone(), 1_000);
        coordinator
            .acquire("k", Duration::from_millis(10), Duration::from_millis(200))
            .await
            .unwrap();

        let handle = coordinator
            .acquire("k", Duration::from_millis(1_000), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(handle.key, "k");
    }

    #[tokio::test]
    async fn test_with_lock_releases_on_error() {
        let backend = InMemoryLockBackend::new();
        let coordinator = coordinator(backend.clone(), 100);

        let result: Result<()> = coordinator
            .with_lock("1000000000", || async {
                Err(AppError::account(ErrorCode::AmountExceedBalance))
            })
            .await;

        assert_eq!(result.unwrap_err().code(), Some(ErrorCode::AmountExceedBalance));
        assert!(!backend.is_locked("test-lock:1000000000").await);
    }

    #[tokio::test]
    async fn test_dropped_guard_releases_lock() {
        let backend = InMemoryLockBackend::new();
        let coordinator = coordinator(backend.clone(), 100);

        let guard = coordinator.lock_account("1000000000").await.unwrap();
        assert!(guard.handle().is_some());
        drop(guard);

        tokio::task::yield_now().await;
        let handle = coordinator
            .acquire(
                "test-lock:1000000000",
                Duration::from_millis(500),
                Duration::from_secs(5),
            )
            .await;
        assert!(handle.is_ok());
    }
}
