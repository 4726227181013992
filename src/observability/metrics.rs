//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ledger_requests_total` (counter): ledger calls by call, result
//! - `ledger_request_duration_seconds` (histogram): ledger call latency
//! - `batch_outcomes_total` (counter): recorded outcomes by status
//! - `batch_duration_seconds` (histogram): wall time per batch
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_ledger_call(call: &'static str, ok: bool, elapsed: Duration) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!("ledger_requests_total", "call" => call, "result" => result).increment(1);
    metrics::histogram!("ledger_request_duration_seconds", "call" => call)
        .record(elapsed.as_secs_f64());
}

pub fn record_outcome(status: &'static str) {
    metrics::counter!("batch_outcomes_total", "status" => status).increment(1);
}

pub fn record_batch(elapsed: Duration, cancelled: bool) {
    let state = if cancelled { "cancelled" } else { "completed" };
    metrics::histogram!("batch_duration_seconds", "state" => state).record(elapsed.as_secs_f64());
}
