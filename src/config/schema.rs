//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::forwarding::ExhaustionPolicy;

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend instances and how they are refreshed.
    pub instances: InstancesConfig,

    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Forwarding behaviour.
    pub forwarding: ForwardingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Backend instance list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InstancesConfig {
    /// Static instance URLs, in round-robin order.
    pub list: Vec<String>,

    /// File holding comma- or newline-separated instance URLs.
    /// When set it takes precedence over `list` and is re-read periodically.
    pub file: Option<PathBuf>,

    /// Refresh interval in seconds.
    pub refresh_interval_secs: u64,

    /// Also refresh as soon as `file` changes on disk.
    pub watch_file: bool,
}

impl Default for InstancesConfig {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            file: None,
            refresh_interval_secs: 10,
            watch_file: false,
        }
    }
}

impl InstancesConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// How long an instance stays excluded after a failure, in seconds.
    pub open_window_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { open_window_secs: 10 }
    }
}

impl CircuitBreakerConfig {
    pub fn open_window(&self) -> Duration {
        Duration::from_secs(self.open_window_secs)
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for one instance to return a full response, in seconds.
    pub read_secs: u64,

    /// Total time for an inbound request, all retries included, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 2,
            read_secs: 3,
            request_secs: 30,
        }
    }
}

/// Forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Result returned once every attempt failed.
    pub exhaustion_policy: ExhaustionPolicy,

    /// Maximum inbound and backend body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            exhaustion_policy: ExhaustionPolicy::ReturnUnavailable,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
