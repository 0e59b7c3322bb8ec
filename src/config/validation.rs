//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every backend parses as an `http` URL with a host:port authority
//! - Value ranges (intervals and timeouts > 0, addresses parse)
//!
//! All errors are collected, not just the first.

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::load_balancer::{Backend, BackendError};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} `{value}` is not a valid socket address")]
    Address { field: &'static str, value: String },
    #[error("timeouts.request_secs ({request}) must be less than timeouts.client_write_secs ({write})")]
    TimeoutOrder { request: u64, write: u64 },
    #[error("proxy header name `{0}` is invalid")]
    HeaderName(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }
    for url in &config.backends {
        if let Err(e) = Backend::parse(url) {
            errors.push(e.into());
        }
    }

    let positive = [
        ("health_check.interval_secs", config.health_check.interval_secs),
        ("health_check.timeout_secs", config.health_check.timeout_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.client_read_secs", config.timeouts.client_read_secs),
        ("timeouts.client_write_secs", config.timeouts.client_write_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    // upstream timeout must fire before the client-facing one
    let (request, write) = (config.timeouts.request_secs, config.timeouts.client_write_secs);
    if request >= write && write > 0 {
        errors.push(ValidationError::TimeoutOrder { request, write });
    }

    let mut addresses = vec![("listener.bind_address", &config.listener.bind_address)];
    if config.observability.metrics_enabled {
        addresses.push(("observability.metrics_address", &config.observability.metrics_address));
    }
    if config.admin.enabled {
        addresses.push(("admin.bind_address", &config.admin.bind_address));
    }
    for (field, value) in addresses {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::Address {
                field,
                value: value.clone(),
            });
        }
    }

    if HeaderName::from_bytes(config.proxy.header_name.as_bytes()).is_err() {
        errors.push(ValidationError::HeaderName(config.proxy.header_name.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
