//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): dispatched requests by strategy, status
//! - `gateway_request_duration_seconds` (histogram): latency by strategy
//! - `gateway_forward_errors_total` (counter): transport failures by error code
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op, so tests need no setup
//! - Prometheus exporter only when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_dispatch(strategy: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "strategy" => strategy,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "strategy" => strategy)
        .record(start.elapsed().as_secs_f64());
}

/// Record a failed remote round-trip.
pub fn record_forward_error(code: &str) {
    metrics::counter!("gateway_forward_errors_total", "code" => code.to_string()).increment(1);
}
