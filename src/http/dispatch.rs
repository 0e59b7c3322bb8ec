//! Request dispatch.
//!
//! # Per-request state machine
//! ```text
//! received ─▶ no-backend-available                       (503, no accounting)
//! received ─▶ backend-selected ─▶ forwarding ─▶ completed-success
//!                                            └▶ completed-error (503; backend dead on transport fault)
//! ```
//!
//! The connection lease is released once upstream response headers are in
//! hand, i.e. at the first response activity toward the client, not when the
//! body finishes streaming. Slow or streaming backends are therefore
//! under-counted by least-connections.

use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{uri::InvalidUri, Request},
    response::Response,
};
use hyper::body::Incoming;
use thiserror::Error;
use tokio::time;

use crate::health::passive;
use crate::http::{
    request,
    response::{from_upstream, service_unavailable},
    server::AppState,
};
use crate::load_balancer::Backend;
use crate::observability::metrics;

/// Failure to obtain a response from the selected backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream transport error: {0}")]
    Transport(#[source] hyper_util::client::legacy::Error),
    #[error("client request body failed mid-forward: {0}")]
    ClientAborted(#[source] hyper_util::client::legacy::Error),
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
    #[error("cannot build upstream uri: {0}")]
    InvalidUri(#[from] InvalidUri),
}

impl From<hyper_util::client::legacy::Error> for ForwardError {
    fn from(error: hyper_util::client::legacy::Error) -> Self {
        if !error.is_connect() && raised_by_request_body(&error) {
            ForwardError::ClientAborted(error)
        } else {
            ForwardError::Transport(error)
        }
    }
}

impl ForwardError {
    /// Whether the failure says something about the backend's health.
    pub fn is_backend_fault(&self) -> bool {
        matches!(self, ForwardError::Transport(_) | ForwardError::Timeout(_))
    }
}

/// The first hyper error in the chain decides: a user error means our side
/// (the inbound body being streamed upstream) failed, not the backend.
fn raised_by_request_body(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
            return hyper_err.is_user() || hyper_err.is_body_write_aborted();
        }
        current = err.source();
    }
    false
}

/// Entry point for every inbound request.
pub async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let Some(mut lease) = state.pool.select() else {
        tracing::warn!(method = %method, path = %path, "No backend available");
        metrics::record_request(method.as_str(), 503, "none", start);
        return service_unavailable();
    };
    let backend = lease.backend().clone();

    tracing::debug!(
        method = %method,
        path = %path,
        backend = %backend.url(),
        connections = backend.connection_count(),
        "Routing request"
    );

    match forward(&state, &backend, request, client_ip).await {
        Ok(response) => {
            lease.release();
            metrics::record_backend_connections(backend.authority(), backend.connection_count());

            let status = response.status();
            metrics::record_request(method.as_str(), status.as_u16(), backend.authority(), start);
            from_upstream(response)
        }
        Err(e) => {
            if e.is_backend_fault() {
                passive::record_forward_failure(&backend, &e);
            } else {
                tracing::warn!(method = %method, path = %path, backend = %backend.url(), error = %e, "Request not forwarded");
            }
            lease.release();
            metrics::record_backend_connections(backend.authority(), backend.connection_count());
            metrics::record_request(method.as_str(), 503, backend.authority(), start);
            service_unavailable()
        }
    }
}

async fn forward(
    state: &AppState,
    backend: &Backend,
    request: Request<Body>,
    client_ip: Option<IpAddr>,
) -> Result<hyper::Response<Incoming>, ForwardError> {
    let (mut parts, body) = request.into_parts();
    request::prepare(&mut parts, backend, client_ip)?;
    let upstream = Request::from_parts(parts, body);

    match time::timeout(state.request_timeout, state.client.request(upstream)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ForwardError::Timeout(state.request_timeout)),
    }
}
