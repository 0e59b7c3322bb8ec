//! HTTP load balancer library.
//!
//! Forwards each inbound request to one of a fixed set of backends chosen by
//! a pluggable strategy, and routes only to backends that a periodic TCP
//! health check (or the last forwarding attempt) found reachable.

// Core subsystems
pub mod config;
pub mod http;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::BalancerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{Backend, BackendPool, LoadBalancer, Strategy};
