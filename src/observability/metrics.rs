//! Metrics collection and exposition.
//!
//! # Metrics
//! - `share_access_total` (counter): terminal outcomes by `outcome`
//! - `share_store_failures_total` (counter): fail-closed denials by `stage`
//! - `share_access_log_dropped_total` (counter): audit entries lost
//! - `share_rate_limit_keys` (gauge): live counter windows
//! - `share_request_duration_seconds` (histogram): handler latency by route
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::guard::OutcomeCode;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_access(outcome: OutcomeCode) {
    metrics::counter!("share_access_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_store_failure(stage: &'static str) {
    metrics::counter!("share_store_failures_total", "stage" => stage).increment(1);
}

pub fn record_access_log_dropped() {
    metrics::counter!("share_access_log_dropped_total").increment(1);
}

pub fn record_rate_limit_keys(live: usize) {
    metrics::gauge!("share_rate_limit_keys").set(live as f64);
}

pub fn record_request_duration(route: &'static str, start: Instant) {
    metrics::histogram!("share_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}
