//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, every path and method to the dispatcher)
//!     → dispatch.rs (select backend, lease connection slot)
//!     → request.rs (rewrite URI, headers)
//!     → upstream client (hyper)
//!     → response.rs (pass through, or 503)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::ForwardError;
pub use request::ProxyHeader;
pub use server::{AppState, HttpServer, ServerError};
