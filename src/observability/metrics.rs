//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): answered requests by method, status, source
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency by method, source
//! - `proxy_backend_attempts_total` (counter): backend calls by backend, outcome
//! - `proxy_migrations_total` (counter): write-backs by outcome
//! - `proxy_failures_total` (counter): failed requests by reason token

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record an answered client request. `source` is `target`, `donor` or `proxy`.
pub fn record_request(method: &str, status: u16, source: &str, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "source" => source.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "proxy_request_duration_seconds",
        "method" => method.to_string(),
        "source" => source.to_string()
    )
    .record(elapsed);
}

/// Record one call to a backend.
pub fn record_backend_attempt(backend: &str, outcome: &'static str) {
    metrics::counter!(
        "proxy_backend_attempts_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_migration(outcome: &'static str) {
    metrics::counter!("proxy_migrations_total", "outcome" => outcome).increment(1);
}

/// Record a failed request by its reason token.
pub fn record_failure(reason: &str) {
    metrics::counter!("proxy_failures_total", "reason" => reason.to_string()).increment(1);
}
