//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router; every path and method goes to the dispatcher
//! - Wire up middleware (tracing, request ID, identifying header, response deadline)
//! - Build the upstream client (connect and idle timeouts)
//! - Accept client connections with a header read deadline
//! - Run the startup health sweep before accepting traffic
//! - Spawn the health monitor and stop it on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderName, HeaderValue, StatusCode},
    routing::any,
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::{conn::auto, graceful::GracefulShutdown},
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::time;
use tower::ServiceExt;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetRequestHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{BalancerConfig, HealthCheckConfig};
use crate::health::HealthMonitor;
use crate::http::{dispatch::dispatch, request::ProxyHeader};
use crate::lifecycle::{shutdown::wait as wait_for_shutdown, Shutdown};
use crate::load_balancer::{BackendError, BackendPool};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("invalid proxy header `{name}: {value}`")]
    ProxyHeader { name: String, value: String },
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<BackendPool>,
    pub client: Client<HttpConnector, Body>,
    pub proxy_header: ProxyHeader,
    /// Upstream deadline for response headers.
    pub request_timeout: Duration,
    /// Client-facing deadline for producing a response.
    pub response_timeout: Duration,
}

impl AppState {
    pub fn new(pool: Arc<BackendPool>, config: &BalancerConfig) -> Result<Self, ServerError> {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.timeouts.idle_secs))
            .build(connector);

        let header_value = config.proxy.header_value(pool.strategy());
        let proxy_header = match (
            HeaderName::from_bytes(config.proxy.header_name.as_bytes()),
            HeaderValue::from_str(header_value),
        ) {
            (Ok(name), Ok(value)) => ProxyHeader { name, value },
            _ => {
                return Err(ServerError::ProxyHeader {
                    name: config.proxy.header_name.clone(),
                    value: header_value.to_string(),
                })
            }
        };

        Ok(Self {
            pool,
            client,
            proxy_header,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            response_timeout: Duration::from_secs(config.timeouts.client_write_secs),
        })
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let ProxyHeader { name, value } = state.proxy_header.clone();
    let response_timeout = state.response_timeout;

    Router::new()
        .route("/{*path}", any(dispatch))
        .route("/", any(dispatch))
        .with_state(state)
        .layer(SetRequestHeaderLayer::overriding(name, value))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, response_timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    pool: Arc<BackendPool>,
    health_check: HealthCheckConfig,
    header_read_timeout: Duration,
    drain_timeout: Duration,
}

impl HttpServer {
    /// Create a new HTTP server. Fails on any malformed backend URL.
    pub fn new(config: BalancerConfig) -> Result<Self, ServerError> {
        let pool = Arc::new(BackendPool::from_urls(&config.backends, config.strategy)?);
        let state = AppState::new(pool.clone(), &config)?;

        Ok(Self {
            router: build_router(state),
            pool,
            health_check: config.health_check,
            header_read_timeout: Duration::from_secs(config.timeouts.client_read_secs),
            drain_timeout: Duration::from_secs(config.timeouts.client_write_secs),
        })
    }

    /// Shared handle on the backend set.
    pub fn pool(&self) -> Arc<BackendPool> {
        self.pool.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let serve_rx = shutdown.subscribe();

        let monitor = if self.health_check.enabled {
            let monitor = HealthMonitor::new(self.pool.clone(), &self.health_check);
            monitor.check_all().await;
            Some(tokio::spawn(monitor.run(shutdown.subscribe())))
        } else {
            tracing::info!("Active health checks disabled");
            None
        };

        tracing::info!(
            address = %addr,
            strategy = %self.pool.strategy(),
            alive = self.pool.alive_count(),
            backends = self.pool.backends().len(),
            "Load balancer serving"
        );

        // The header timer also runs while a keep-alive connection waits
        // for its next request, so it bounds idle connections too.
        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.header_read_timeout);
        let graceful = GracefulShutdown::new();

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(serve_rx.clone()) => break,
                accepted = listener.accept() => {
                    let (stream, remote) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            time::sleep(Duration::from_millis(100)).await;
                            continue;
                        }
                    };

                    let router = self.router.clone();
                    let service = hyper::service::service_fn(move |mut request: hyper::Request<Incoming>| {
                        request.extensions_mut().insert(ConnectInfo(remote));
                        router.clone().oneshot(request)
                    });

                    let builder = builder.clone();
                    let watcher = graceful.watcher();
                    let first_byte_timeout = self.header_read_timeout;
                    tokio::spawn(async move {
                        // protocol detection waits for the first bytes with no deadline of its own
                        match time::timeout(first_byte_timeout, stream.peek(&mut [0u8; 1])).await {
                            Ok(Ok(n)) if n > 0 => {}
                            _ => {
                                tracing::debug!(client = %remote, "Client sent nothing before the read deadline");
                                return;
                            }
                        }

                        let conn = builder.serve_connection(TokioIo::new(stream), service);
                        if let Err(e) = watcher.watch(conn).await {
                            tracing::debug!(client = %remote, error = %e, "Client connection closed with error");
                        }
                    });
                }
            }
        }

        drop(listener);
        tracing::info!(connections = graceful.count(), "Draining client connections");
        if time::timeout(self.drain_timeout, graceful.shutdown()).await.is_err() {
            tracing::warn!("Client connections still open after drain timeout");
        }

        if let Some(handle) = monitor {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Health monitor task failed");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
