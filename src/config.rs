use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub application: ApplicationSettings,
    #[serde(default)]
    pub lock: LockSettings,
    #[serde(default)]
    pub transaction: TransactionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Per-account lock tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    pub key_prefix: String,
    pub wait_timeout_ms: u64,
    pub lease_timeout_ms: u64,
    pub retry_interval_ms: u64,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            key_prefix: "account-lock".to_string(),
            wait_timeout_ms: 1_000,
            lease_timeout_ms: 15_000,
            retry_interval_ms: 50,
        }
    }
}

impl LockSettings {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn lease_timeout(&self) -> Duration {
        Duration::from_millis(self.lease_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.max(1))
    }
}

/// Bounds applied to use/cancel requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransactionSettings {
    pub min_amount: i64,
    pub max_amount: i64,
    pub cancel_window_months: u32,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        Self {
            min_amount: 10,
            max_amount: 1_000_000_000,
            cancel_window_months: 12,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_settings_defaults() {
        let settings = LockSettings::default();
        assert_eq!(settings.wait_timeout(), Duration::from_secs(1));
        assert_eq!(settings.lease_timeout(), Duration::from_secs(15));
        assert_eq!(settings.key_prefix, "account-lock");
    }

    #[test]
    fn test_retry_interval_never_zero() {
        let settings = LockSettings {
            retry_interval_ms: 0,
            ..LockSettings::default()
        };
        assert_eq!(settings.retry_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_settings_from_toml() {
        let raw = r#"
            [database]
            url = "postgres://localhost/accounts"
            pool_size = 4

            [redis]
            url = "redis://localhost:6379"

            [application]
            host = "127.0.0.1"
            port = 8080
            log_level = "debug"

            [lock]
            wait_timeout_ms = 250
        "#;
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.lock.wait_timeout_ms, 250);
        assert_eq!(settings.lock.lease_timeout_ms, 15_000);
        assert_eq!(settings.transaction.max_amount, 1_000_000_000);
        assert_eq!(settings.application.log_format, "pretty");
    }
}
