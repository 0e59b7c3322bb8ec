//! Least Connections load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Least connections selector.
/// Selects the alive backend with the fewest in-flight requests.
///
/// The minimum is a snapshot: two concurrent calls may both see the same
/// backend as least loaded before either increments it.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastConnections {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        // min_by_key keeps the first of equal minimums: ties go to the lowest index
        backends
            .iter()
            .filter(|b| b.is_alive())
            .min_by_key(|b| b.connection_count())
            .cloned()
    }
}
