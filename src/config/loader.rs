//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<BalancerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read and parse a TOML file without validating it, so callers can apply
/// overrides before [`validate_config`] runs.
pub fn read_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::Strategy;

    #[test]
    fn parses_minimal_toml_with_defaults() {
        let config = parse_config(
            r#"
            backends = ["http://10.0.0.1:8080", "http://10.0.0.2:8080"]
            strategy = "least-connections"

            [health_check]
            interval_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.strategy, Strategy::LeastConnections);
        assert_eq!(config.health_check.interval_secs, 30);
        assert_eq!(config.health_check.timeout_secs, 2);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.proxy.header_value(config.strategy), "Least-Connections-Load-Balancer");
    }

    #[test]
    fn rejects_unknown_strategy() {
        let err = parse_config(r#"strategy = "random""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_config_reports_validation_errors() {
        let path = std::env::temp_dir().join(format!("lb-config-{}.toml", std::process::id()));
        fs::write(&path, "backends = [\"ftp://nowhere\", \"nope\"]\n").unwrap();

        let err = load_config(&path).unwrap_err();
        let _ = fs::remove_file(&path);

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn read_config_defers_validation_to_the_caller() {
        let path = std::env::temp_dir().join(format!("lb-config-override-{}.toml", std::process::id()));
        fs::write(&path, "[health_check]\ninterval_secs = 0\n").unwrap();

        let read = read_config(&path);
        let loaded = load_config(&path);
        let _ = fs::remove_file(&path);

        let mut config = read.unwrap();
        assert!(matches!(loaded, Err(ConfigError::Validation(_))));

        config.health_check.interval_secs = 30;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
