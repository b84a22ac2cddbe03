//! Metrics collection and exposition.
//!
//! # Metrics
//! - `contact_submissions_total` (counter): submissions by outcome
//! - `contact_rate_limited_total` (counter): quota rejections
//! - `contact_delivery_duration_seconds` (histogram): transport latency by result
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Outcome labels are the fixed failure reasons, never user input

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a finished submission.
pub fn record_submission(outcome: &'static str) {
    counter!("contact_submissions_total", "outcome" => outcome).increment(1);
}

/// Count a rate-limited attempt.
pub fn record_rate_limited() {
    counter!("contact_rate_limited_total").increment(1);
}

/// Record how long the transport took.
pub fn record_delivery(ok: bool, started: Instant) {
    let result = if ok { "ok" } else { "failed" };
    histogram!("contact_delivery_duration_seconds", "result" => result)
        .record(started.elapsed().as_secs_f64());
}
