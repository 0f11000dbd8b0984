use std::future::Future;

use crate::error::Result;
use crate::lock::LockCoordinator;

/// Runs `handler` with `request` while holding the lock for the account that
/// `account_of` extracts from it.
///
/// A failed acquisition returns `LockAcquisitionTimeout` without invoking the
/// handler. The lock is released before the handler's result is returned.
pub async fn with_account_lock<Req, T, K, H, Fut>(
    locks: &LockCoordinator,
    request: Req,
    account_of: K,
    handler: H,
) -> Result<T>
where
    K: FnOnce(&Req) -> &str,
    H: FnOnce(Req) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let account_number = account_of(&request).to_string();
    locks
        .with_lock(&account_number, move || handler(request))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockSettings;
    use crate::error::{AppError, ErrorCode};
    use crate::lock::InMemoryLockBackend;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Req {
        account_number: String,
    }

    fn locks(backend: InMemoryLockBackend) -> LockCoordinator {
        LockCoordinator::new(
            Arc::new(backend),
            LockSettings {
                key_prefix: "account-lock".to_string(),
                wait_timeout_ms: 100,
                lease_timeout_ms: 5_000,
                retry_interval_ms: 10,
            },
        )
    }

    #[tokio::test]
    async fn test_handler_runs_under_lock() {
        let backend = InMemoryLockBackend::new();
        let locks = locks(backend.clone());
        let request = Req {
            account_number: "1000000000".to_string(),
        };

        let observer = backend.clone();
        let held = with_account_lock(
            &locks,
            request,
            |r| r.account_number.as_str(),
            |r| async move { Ok(observer.is_locked(&format!("account-lock:{}", r.account_number)).await) },
        )
        .await
        .unwrap();

        assert!(held);
        assert!(!backend.is_locked("account-lock:1000000000").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_skipped_on_timeout() {
        let backend = InMemoryLockBackend::new();
        let locks = locks(backend.clone());
        let _other = locks
            .acquire(
                "account-lock:1000000000",
                Duration::from_millis(10),
                Duration::from_secs(30),
            )
            .await
            .unwrap();

        let invoked = AtomicBool::new(false);
        let result: Result<()> = with_account_lock(
            &locks,
            Req {
                account_number: "1000000000".to_string(),
            },
            |r| r.account_number.as_str(),
            |_| async {
                invoked.store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert_eq!(
            result.unwrap_err().code(),
            Some(ErrorCode::LockAcquisitionTimeout)
        );
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_handler_error_is_returned_and_lock_released() {
        let backend = InMemoryLockBackend::new();
        let locks = locks(backend.clone());

        let result: Result<()> = with_account_lock(
            &locks,
            Req {
                account_number: "1000000001".to_string(),
            },
            |r| r.account_number.as_str(),
            |_| async { Err(AppError::account(ErrorCode::AccountNotFound)) },
        )
        .await;

        assert_eq!(result.unwrap_err().code(), Some(ErrorCode::AccountNotFound));
        assert!(!backend.is_locked("account-lock:1000000001").await);
    }
}
