//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request received
//!     → pool.rs (fixed, ordered backend set)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through alive backends)
//!         - least_conn.rs (pick alive backend with fewest in-flight requests)
//!     → backend.rs (lease a connection slot)
//!     → Return lease or "none available"
//! ```
//!
//! # Design Decisions
//! - Algorithms see only the backend slice; pool owns the set
//! - Dead backends are never selected
//! - Per-backend atomics, no lock spanning the whole set

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod least_conn;
pub mod pool;
pub mod round_robin;

pub use backend::{Backend, BackendError, ConnectionLease};
pub use least_conn::LeastConnections;
pub use pool::BackendPool;
pub use round_robin::RoundRobin;

/// A backend selection algorithm.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Pick the next backend, or `None` when no backend is alive.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

/// Configured selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    LeastConnections,
}

impl Strategy {
    /// Build the selector for this strategy.
    pub fn build(self) -> Box<dyn LoadBalancer> {
        match self {
            Strategy::RoundRobin => Box::new(RoundRobin::new()),
            Strategy::LeastConnections => Box::new(LeastConnections::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::RoundRobin => "round-robin",
            Strategy::LeastConnections => "least-connections",
        }
    }

    /// Default value of the identifying header on forwarded requests.
    pub fn proxy_header_value(self) -> &'static str {
        match self {
            Strategy::RoundRobin => "Round-Robin-Load-Balancer",
            Strategy::LeastConnections => "Least-Connections-Load-Balancer",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" => Ok(Strategy::RoundRobin),
            "least-connections" => Ok(Strategy::LeastConnections),
            other => Err(format!(
                "unknown strategy `{}` (expected round-robin or least-connections)",
                other
            )),
        }
    }
}
