//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, intervals > 0)
//! - Check that every configured instance is an absolute http URL
//! - Check that some instance source is configured at all
//! - Keep the whole-request budget above a single attempt's read timeout
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - File sources are only checked for presence here; their content is read at startup

use std::net::{SocketAddr, ToSocketAddrs};
use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("no instances configured: set instances.list or instances.file")]
    NoInstances,

    #[error("instance '{address}' is invalid: {reason}")]
    Instance { address: String, reason: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),

    #[error("timeouts.request_secs ({request_secs}) must exceed timeouts.read_secs ({read_secs})")]
    RequestTimeout { request_secs: u64, read_secs: u64 },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !resolves(&config.listener.bind_address) {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.instances.file.is_none() && config.instances.list.iter().all(|s| s.trim().is_empty()) {
        errors.push(ValidationError::NoInstances);
    }
    for address in &config.instances.list {
        if let Err(reason) = validate_instance_url(address) {
            errors.push(ValidationError::Instance {
                address: address.clone(),
                reason,
            });
        }
    }

    let positive = [
        ("instances.refresh_interval_secs", config.instances.refresh_interval_secs),
        ("circuit_breaker.open_window_secs", config.circuit_breaker.open_window_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.read_secs", config.timeouts.read_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("forwarding.max_body_bytes", config.forwarding.max_body_bytes as u64),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    let timeouts = &config.timeouts;
    if timeouts.read_secs > 0 && timeouts.request_secs > 0 && timeouts.request_secs <= timeouts.read_secs {
        errors.push(ValidationError::RequestTimeout {
            request_secs: timeouts.request_secs,
            read_secs: timeouts.read_secs,
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Host names are resolved the way `TcpListener::bind` resolves them.
fn resolves(address: &str) -> bool {
    address
        .to_socket_addrs()
        .map(|mut addrs| addrs.next().is_some())
        .unwrap_or(false)
}

/// Check that `address` is an absolute `http` URL with a host.
pub fn validate_instance_url(address: &str) -> Result<(), String> {
    let url = Url::parse(address.trim()).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
