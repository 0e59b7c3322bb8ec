//! Backend pool management.
//!
//! # Responsibilities
//! - Own the fixed, ordered backend set
//! - Apply the configured load balancing algorithm
//! - Hand out connection leases for accounting

use std::sync::Arc;

use crate::load_balancer::{
    backend::{Backend, BackendError, ConnectionLease},
    LoadBalancer, Strategy,
};
use crate::observability::metrics;

/// Owns the backend set and the selection algorithm.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn LoadBalancer>,
    strategy: Strategy,
}

impl BackendPool {
    /// Build a pool from configured base URLs. Any malformed entry fails the whole pool.
    pub fn from_urls<S: AsRef<str>>(urls: &[S], strategy: Strategy) -> Result<Self, BackendError> {
        let backends = urls
            .iter()
            .map(|u| Backend::parse(u.as_ref()).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        for b in &backends {
            tracing::info!(backend = %b.url(), "Configured backend");
        }

        Ok(Self::with_balancer(backends, strategy.build(), strategy))
    }

    /// Build a pool around an explicit selector.
    pub fn with_balancer(
        backends: Vec<Arc<Backend>>,
        balancer: Box<dyn LoadBalancer>,
        strategy: Strategy,
    ) -> Self {
        Self {
            backends,
            balancer,
            strategy,
        }
    }

    /// Select a backend and account for the new request.
    /// Returns `None` (with no accounting) when no backend is alive.
    pub fn select(&self) -> Option<ConnectionLease> {
        match self.balancer.next_server(&self.backends) {
            Some(backend) => {
                let lease = backend.lease();
                metrics::record_backend_connections(backend.authority(), backend.connection_count());
                Some(lease)
            }
            None => {
                tracing::debug!(backend_count = self.backends.len(), "No alive backends");
                for b in &self.backends {
                    tracing::debug!(
                        backend = %b.url(),
                        alive = b.is_alive(),
                        connections = b.connection_count(),
                        "Backend status"
                    );
                }
                None
            }
        }
    }

    /// All backends, in configured order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }
}
