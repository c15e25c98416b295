//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_failed_attempts_total` (counter): attempts recorded, by limiter
//! - `guard_blocks_total` (counter): attempts that tripped a block, by limiter
//! - `guard_rejected_total` (counter): requests refused while blocked, by limiter
//! - `guard_evicted_total` (counter): entries dropped by idle cleanup, by limiter
//! - `guard_tracked_keys` (gauge): keys currently held, by limiter
//! - `guard_http_requests_total` (counter): handled requests, by route and status
//!
//! # Design Decisions
//! - Uses the `metrics` facade; calls are no-ops until a recorder is installed
//! - Prometheus exporter is opt-in via config

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_failed_attempt(limiter: &str) {
    ::metrics::counter!("guard_failed_attempts_total", "limiter" => limiter.to_owned()).increment(1);
}

pub fn record_block(limiter: &str) {
    ::metrics::counter!("guard_blocks_total", "limiter" => limiter.to_owned()).increment(1);
}

pub fn record_rejected(limiter: &str) {
    ::metrics::counter!("guard_rejected_total", "limiter" => limiter.to_owned()).increment(1);
}

pub fn record_evicted(limiter: &str, count: usize) {
    ::metrics::counter!("guard_evicted_total", "limiter" => limiter.to_owned()).increment(count as u64);
}

pub fn record_tracked_keys(limiter: &str, count: usize) {
    ::metrics::gauge!("guard_tracked_keys", "limiter" => limiter.to_owned()).set(count as f64);
}

pub fn record_request(route: &str, status: u16) {
    ::metrics::counter!(
        "guard_http_requests_total",
        "route" => route.to_owned(),
        "status" => status.to_string()
    )
    .increment(1);
}
