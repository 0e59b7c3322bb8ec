//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Startup sweep, then periodic timer
//!     → TCP connect to each backend, one at a time
//!     → Backend::set_alive
//!
//! Passive health checks (passive.rs):
//!     Forwarding failure observed
//!     → Backend marked dead immediately
//! ```
//!
//! # Design Decisions
//! - Probe only requires TCP reachability, not a valid HTTP response
//! - Health state is per-backend, shared with the dispatcher
//! - Transitions are logged once; repeated identical results are silent

pub mod active;
pub mod passive;

pub use active::{probe, HealthMonitor};
