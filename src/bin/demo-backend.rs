//! Demo backend: answers every path with details of the request it received.

use std::fmt::Write;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    routing::get,
    Router,
};
use clap::Parser;

#[derive(Parser)]
#[command(name = "demo-backend", about = "Demo HTTP backend for the load balancer")]
struct Args {
    /// Port to serve on
    #[arg(short, long, default_value_t = 8081)]
    port: u16,
}

async fn describe(State(port): State<u16>, request: Request) -> String {
    // simulated processing time
    tokio::time::sleep(Duration::from_millis(100)).await;

    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
    tracing::info!(port, method = %request.method(), path = %request.uri().path(), "Received request");

    let mut out = String::new();
    let _ = writeln!(out, "Backend server on port {}", port);
    let _ = writeln!(out, "Host: {}", hostname);
    let _ = writeln!(out, "Request path: {}", request.uri().path());
    let _ = writeln!(out, "Request method: {}", request.method());
    let _ = writeln!(out, "Request headers:");
    for (name, value) in request.headers() {
        let _ = writeln!(out, "  {}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    out
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demo_backend=info".into()),
        )
        .init();

    let args = Args::parse();
    let app = Router::new()
        .route("/health", get(|| async { "healthy" }))
        .fallback(describe)
        .with_state(args.port);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Demo backend listening");

    axum::serve(listener, app).await?;
    Ok(())
}
