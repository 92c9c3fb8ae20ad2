//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound chat requests by status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_route_attempts_total` (counter): provider calls by route, provider, outcome
//! - `gateway_route_skipped_total` (counter): routes skipped by an open breaker
//! - `gateway_breaker_store_errors_total` (counter): breaker store failures by operation
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("gateway_requests_total", "status" => status.to_string()).increment(1);
    histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_route_attempt(route: &str, provider: &str, outcome: &'static str) {
    counter!(
        "gateway_route_attempts_total",
        "route" => route.to_string(),
        "provider" => provider.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_route_skipped(route: &str) {
    counter!("gateway_route_skipped_total", "route" => route.to_string()).increment(1);
}

pub fn record_breaker_store_error(op: &'static str) {
    counter!("gateway_breaker_store_errors_total", "op" => op).increment(1);
}
