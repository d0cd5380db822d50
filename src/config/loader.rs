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

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read configuration without semantic checks.
///
/// Callers that apply overrides afterwards must validate the result themselves.
pub fn read_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<BalancerConfig, ConfigError> {
    let config: BalancerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarding::ExhaustionPolicy;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [instances]
            list = ["http://localhost:8081", "http://localhost:8082"]
            refresh_interval_secs = 5

            [circuit_breaker]
            open_window_secs = 30

            [forwarding]
            exhaustion_policy = "raise_last_error"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.instances.list.len(), 2);
        assert_eq!(config.instances.refresh_interval_secs, 5);
        assert_eq!(config.circuit_breaker.open_window_secs, 30);
        assert_eq!(config.forwarding.exhaustion_policy, ExhaustionPolicy::RaiseLastError);
        // Untouched sections keep their defaults.
        assert_eq!(config.timeouts.connect_secs, 2);
        assert_eq!(config.timeouts.read_secs, 3);
    }

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = parse_config("[instances]\nlist = [\"http://a:1\"]\n").unwrap();
        assert_eq!(config.circuit_breaker.open_window_secs, 10);
        assert_eq!(config.forwarding.exhaustion_policy, ExhaustionPolicy::ReturnUnavailable);
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = parse_config(
            "[instances]\nlist = [\"http://a:1\"]\n[forwarding]\nexhaustion_policy = \"panic\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_config_fails_validation() {
        let err = parse_config("").unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors, vec![ValidationError::NoInstances]),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[instances]\nlist = [\"http://localhost:8081\"]").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.instances.list, vec!["http://localhost:8081"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
