//! HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//! Client ─▶ http::server ─▶ http::dispatch ─▶ load_balancer::pool (strategy)
//!                                │                      │
//!                                │ lease slot           ▼
//!                                └────────▶ upstream client ─▶ Backend
//!
//! health::active ── TCP probe every interval ──▶ Backend alive/dead
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use http_load_balancer::config::{read_config, validate_config, BalancerConfig};
use http_load_balancer::lifecycle::{self, signals, Shutdown};
use http_load_balancer::observability::init_logging;
use http_load_balancer::Strategy;

#[derive(Parser, Debug)]
#[command(name = "http-load-balancer", version, about = "HTTP load balancer")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to serve on
    #[arg(short, long)]
    port: Option<u16>,

    /// Interval for health checking backends, in seconds
    #[arg(long)]
    check_interval: Option<u64>,

    /// Backend selection strategy (round-robin, least-connections)
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Backend base URL; repeat to list several (replaces configured backends)
    #[arg(long = "backend")]
    backends: Vec<String>,
}

impl Args {
    fn apply(self, config: &mut BalancerConfig) {
        if let Some(port) = self.port {
            config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                }
                Err(_) => format!("0.0.0.0:{}", port),
            };
        }
        if let Some(secs) = self.check_interval {
            config.health_check.interval_secs = secs;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if !self.backends.is_empty() {
            config.backends = self.backends;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => BalancerConfig::default(),
    };
    args.apply(&mut config);

    // validated once, after command-line overrides
    if let Err(errors) = validate_config(&config) {
        for e in &errors {
            eprintln!("configuration error: {}", e);
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    init_logging(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        strategy = %config.strategy,
        backends = config.backends.len(),
        check_interval_secs = config.health_check.interval_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    lifecycle::run(config, shutdown).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_backend() -> BalancerConfig {
        let mut config = BalancerConfig::default();
        config.backends = vec!["http://127.0.0.1:8081".to_string()];
        config
    }

    #[test]
    fn flag_repairs_invalid_file_value() {
        let mut config = config_with_backend();
        config.health_check.interval_secs = 0;
        assert!(validate_config(&config).is_err());

        Args::parse_from(["http-load-balancer", "--check-interval", "15"]).apply(&mut config);
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.health_check.interval_secs, 15);
    }

    #[test]
    fn invalid_flag_is_caught_after_override() {
        let mut config = config_with_backend();
        Args::parse_from(["http-load-balancer", "--check-interval", "0", "--port", "9090"]).apply(&mut config);

        assert!(validate_config(&config).is_err());
        assert!(config.listener.bind_address.ends_with(":9090"));
    }
}
