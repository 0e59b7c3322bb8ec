//! Passive health checking (failure detection).
//!
//! A transport failure while forwarding marks the backend dead at once,
//! without waiting for the next sweep. Only the active checker brings it back.

use crate::load_balancer::Backend;
use crate::observability::metrics;

/// Record a forwarding failure against `backend`.
pub fn record_forward_failure(backend: &Backend, error: &dyn std::fmt::Display) {
    metrics::record_forward_failure(backend.authority());

    if backend.set_alive(false) {
        tracing::warn!(backend = %backend.url(), error = %error, "Backend marked dead after forwarding failure");
        metrics::record_backend_health(backend.authority(), false);
    } else {
        tracing::debug!(backend = %backend.url(), error = %error, "Forwarding failed on dead backend");
    }
}
