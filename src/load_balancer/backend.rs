//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server and its immutable base URL
//! - Track in-flight requests (for Least Connections LB)
//! - Track health state (alive/dead)
//!
//! Each backend guards its own state with atomics, so activity on one
//! backend never contends with activity on another.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use url::Url;

/// Error building a backend from a configured address.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("backend url `{0}` has no host:port authority")]
    MissingAuthority(String),
    #[error("backend url `{url}` uses unsupported scheme `{scheme}`")]
    UnsupportedScheme { url: String, scheme: String },
}

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Base URL, fixed at construction.
    url: Url,
    /// `host:port` used for probing and as the forwarding authority.
    authority: String,
    /// Health flag, true until a probe or forward says otherwise.
    alive: AtomicBool,
    /// Number of in-flight requests assigned to this backend.
    connections: AtomicUsize,
}

impl Backend {
    /// Parse a configured base URL into a backend.
    pub fn parse(raw: &str) -> Result<Self, BackendError> {
        let url = Url::parse(raw).map_err(|source| BackendError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;

        if url.scheme() != "http" {
            return Err(BackendError::UnsupportedScheme {
                url: raw.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h,
            _ => return Err(BackendError::MissingAuthority(raw.to_string())),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| BackendError::MissingAuthority(raw.to_string()))?;
        let authority = format!("{}:{}", host, port);

        Ok(Self {
            url,
            authority,
            alive: AtomicBool::new(true),
            connections: AtomicUsize::new(0),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Set the health flag, returning the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        self.alive.swap(alive, Ordering::AcqRel)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Increment in-flight count.
    pub fn inc_connections(&self) {
        self.connections.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrement in-flight count. No-op at zero.
    pub fn dec_connections(&self) {
        let _ = self
            .connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Get the current number of in-flight requests.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }

    /// Account for a new request and return the lease that releases it.
    pub fn lease(self: &Arc<Self>) -> ConnectionLease {
        self.inc_connections();
        ConnectionLease {
            backend: self.clone(),
            released: false,
        }
    }
}

/// A RAII lease on one unit of a backend's connection count.
///
/// The count is decremented exactly once: on the first call to
/// [`ConnectionLease::release`], or on drop if never released.
#[derive(Debug)]
pub struct ConnectionLease {
    backend: Arc<Backend>,
    released: bool,
}

impl ConnectionLease {
    /// Release the connection slot. Subsequent calls are no-ops.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.backend.dec_connections();
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }
}

impl Deref for ConnectionLease {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        self.release();
    }
}
