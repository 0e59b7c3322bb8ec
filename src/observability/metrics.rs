//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): requests by method, status, backend
//! - `lb_request_duration_seconds` (histogram): time to upstream response headers
//! - `lb_backend_healthy` (gauge): 1=alive, 0=dead
//! - `lb_backend_connections` (gauge): in-flight requests per backend
//! - `lb_forward_failures_total` (counter): transport failures per backend

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    counter!(
        "lb_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);

    histogram!("lb_request_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(backend: &str, alive: bool) {
    gauge!("lb_backend_healthy", "backend" => backend.to_string()).set(if alive { 1.0 } else { 0.0 });
}

pub fn record_backend_connections(backend: &str, connections: usize) {
    gauge!("lb_backend_connections", "backend" => backend.to_string()).set(connections as f64);
}

pub fn record_forward_failure(backend: &str) {
    counter!("lb_forward_failures_total", "backend" => backend.to_string()).increment(1);
}
