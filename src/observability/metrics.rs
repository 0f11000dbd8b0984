use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for balance operations and account locks.
#[derive(Debug, Clone)]
pub struct Metrics {
    initialized: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self { initialized: true }
    }

    pub fn record_transaction(&self, transaction_type: &str, result: &str) {
        counter!("account_transactions_total", "type" => transaction_type.to_string(), "result" => result.to_string()).increment(1);
    }

    pub fn record_transaction_rejected(&self, transaction_type: &str, error_code: &str) {
        counter!("account_transactions_rejected_total", "type" => transaction_type.to_string(), "code" => error_code.to_string()).increment(1);
    }

    pub fn record_failure_audit(&self, transaction_type: &str, written: bool) {
        counter!("account_failure_audits_total", "type" => transaction_type.to_string(), "written" => written.to_string()).increment(1);
    }

    pub fn record_operation_latency(&self, operation: &str, duration_ms: f64) {
        histogram!("account_operation_duration_ms", "operation" => operation.to_string()).record(duration_ms);
    }

    pub fn record_lock_acquired(&self, wait_ms: f64, attempts: u32) {
        counter!("account_lock_acquired_total").increment(1);
        histogram!("account_lock_wait_duration_ms").record(wait_ms);
        histogram!("account_lock_attempts").record(attempts as f64);
    }

    pub fn record_lock_timeout(&self, wait_ms: f64) {
        counter!("account_lock_timeouts_total").increment(1);
        histogram!("account_lock_wait_duration_ms").record(wait_ms);
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_ms: f64) {
        counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
        histogram!("http_request_duration_ms", "method" => method.to_string(), "path" => path.to_string()).record(duration_ms);
    }

    pub fn record_redis_operation(&self, operation: &str, duration_ms: f64, success: bool) {
        counter!("redis_operations_total", "operation" => operation.to_string(), "success" => success.to_string()).increment(1);
        histogram!("redis_operation_duration_ms", "operation" => operation.to_string()).record(duration_ms);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the Prometheus recorder and returns its handle.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    METRICS.get_or_init(Metrics::new);

    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

fn describe_metrics() {
    describe_counter!("account_transactions_total", Unit::Count, "Balance transactions persisted, by type and result");
    describe_counter!("account_transactions_rejected_total", Unit::Count, "Balance operations rejected by a business rule");
    describe_counter!("account_failure_audits_total", Unit::Count, "Failure audit attempts, by whether a row was written");
    describe_histogram!("account_operation_duration_ms", Unit::Milliseconds, "Locked operation latency in milliseconds");

    describe_counter!("account_lock_acquired_total", Unit::Count, "Account locks acquired");
    describe_counter!("account_lock_timeouts_total", Unit::Count, "Account lock acquisitions that timed out");
    describe_histogram!("account_lock_wait_duration_ms", Unit::Milliseconds, "Time spent waiting for an account lock");
    describe_histogram!("account_lock_attempts", Unit::Count, "Attempts needed to acquire an account lock");

    describe_counter!("http_requests_total", Unit::Count, "Total HTTP requests");
    describe_histogram!("http_request_duration_ms", Unit::Milliseconds, "HTTP request latency in milliseconds");

    describe_counter!("redis_operations_total", Unit::Count, "Total Redis operations");
    describe_histogram!("redis_operation_duration_ms", Unit::Milliseconds, "Redis operation latency in milliseconds");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
