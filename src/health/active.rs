//! Active health checking.
//!
//! # Responsibilities
//! - Probe every backend with a bounded TCP connect
//! - Run one sweep at startup, then one per interval until shutdown
//! - Update backend health state based on results
//!
//! Sweeps are sequential, so health state is at most
//! `interval + backends * timeout` stale.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::lifecycle::shutdown::wait as wait_for_shutdown;
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::metrics;

/// Attempt a TCP connection to `authority` within `timeout`.
pub async fn probe(authority: &str, timeout: Duration) -> bool {
    match time::timeout(timeout, TcpStream::connect(authority)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            tracing::debug!(addr = %authority, error = %e, "Backend unreachable");
            false
        }
        Err(_) => {
            tracing::debug!(addr = %authority, timeout = ?timeout, "Backend probe timed out");
            false
        }
    }
}

pub struct HealthMonitor {
    pool: Arc<BackendPool>,
    interval: Duration,
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(pool: Arc<BackendPool>, config: &HealthCheckConfig) -> Self {
        Self {
            pool,
            interval: Duration::from_secs(config.interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Periodic sweeps until a shutdown signal arrives.
    ///
    /// The first tick is one interval out; the startup sweep is expected to
    /// have run already via [`HealthMonitor::check_all`].
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.timeout.as_secs(),
            backends = self.pool.backends().len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(shutdown.clone()) => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.check_all().await;
                }
            }
        }
    }

    /// One full sweep, backend by backend.
    pub async fn check_all(&self) {
        for backend in self.pool.backends() {
            let alive = probe(backend.authority(), self.timeout).await;
            apply_result(backend, alive);
        }
        tracing::debug!(
            alive = self.pool.alive_count(),
            total = self.pool.backends().len(),
            "Health sweep complete"
        );
    }
}

fn apply_result(backend: &Backend, alive: bool) {
    let was_alive = backend.set_alive(alive);
    if was_alive != alive {
        if alive {
            tracing::info!(backend = %backend.url(), connections = backend.connection_count(), "Backend is alive");
        } else {
            tracing::warn!(backend = %backend.url(), "Backend is dead");
        }
    }
    metrics::record_backend_health(backend.authority(), alive);
}
