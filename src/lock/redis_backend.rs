use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::lock::LockBackend;
use crate::observability::{get_metrics, LatencyTimer};

/// Deletes the key only while it still holds our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Lease-based lock stored in Redis, shared by every service instance.
///
/// A lease is a `SET key token NX PX lease` entry; Redis expires it on its own
/// if the holder never releases it.
#[derive(Clone)]
pub struct RedisLockBackend {
    conn: MultiplexedConnection,
    release_script: redis::Script,
}

impl RedisLockBackend {
    pub async fn connect(client: &redis::Client) -> Result<Self> {
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(AppError::Redis)?;
        Ok(Self::new(conn))
    }

    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            release_script: redis::Script::new(RELEASE_SCRIPT),
        }
    }
}

#[async_trait]
impl LockBackend for RedisLockBackend {
    async fn try_lock(&self, key: &str, token: &str, lease: Duration) -> Result<bool> {
        let timer = LatencyTimer::new();
        let mut conn = self.conn.clone();
        let lease_ms = lease.as_millis().max(1) as usize;

        let result: redis::RedisResult<Option<String>> = conn
            .set_options(
                key,
                token,
                redis::SetOptions::default()
                    .conditional_set(redis::ExistenceCheck::NX)
                    .with_expiration(redis::SetExpiry::PX(lease_ms)),
            )
            .await;
        get_metrics().record_redis_operation("lock", timer.elapsed_ms(), result.is_ok());

        Ok(result.map_err(AppError::Redis)?.is_some())
    }

    async fn unlock(&self, key: &str, token: &str) -> Result<bool> {
        let timer = LatencyTimer::new();
        let mut conn = self.conn.clone();

        let result: redis::RedisResult<i64> = self
            .release_script
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await;
        get_metrics().record_redis_operation("unlock", timer.elapsed_ms(), result.is_ok());

        Ok(result.map_err(AppError::Redis)? > 0)
    }
}
