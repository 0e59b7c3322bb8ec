//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order from a validated config
//! - Start background tasks (metrics exporter, admin API)
//! - Bind the listener and hand over to the HTTP server
//!
//! Any startup error is fatal.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::BalancerConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{shutdown::wait as wait_for_shutdown, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("invalid {field} `{value}`")]
    Address { field: &'static str, value: String },
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Run the load balancer until `shutdown` fires.
pub async fn run(config: BalancerConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address {
                field: "metrics_address",
                value: config.observability.metrics_address.clone(),
            })?;
        metrics::init_metrics(addr);
    }

    let admin = config.admin.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    if admin.enabled {
        let listener = bind(&admin.bind_address).await?;
        let router = setup_admin_router(AdminState {
            pool: server.pool(),
            api_key: Arc::from(admin.api_key.as_str()),
        });
        let rx = shutdown.subscribe();
        tracing::info!(address = %admin.bind_address, "Admin API listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(wait_for_shutdown(rx))
                .await
            {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    let listener = bind(&bind_address).await?;
    server.run(listener, shutdown).await.map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}
