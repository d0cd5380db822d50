//! Ordered startup.
//!
//! # Responsibilities
//! - Resolve the configuration from file, CLI overrides and defaults
//! - Seed the instance registry from the configured source
//! - Build the circuit breaker, transport and forwarder
//! - Start the refresher, the optional file watcher and the metrics endpoint
//! - Serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: an empty initial instance list or a bad config stops startup
//! - Refreshing only runs for file sources; a static list never changes

use notify::RecommendedWatcher;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{read_config, validate_config, BalancerConfig, ConfigError};
use crate::discovery::{
    FileSource, InstanceFileWatcher, InstanceRefresher, InstanceSource, SourceError, StaticSource,
};
use crate::forwarding::Forwarder;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_listener;
use crate::load_balancer::{BalancerError, InstanceRegistry};
use crate::observability::metrics;
use crate::resilience::CircuitBreaker;
use crate::transport::HttpTransport;

/// A startup step failed; the process should exit.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to load initial instances: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Balancer(#[from] BalancerError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("Failed to watch instance file: {0}")]
    Watch(#[from] notify::Error),

    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Comma-separated instance URLs replacing `instances.list`.
    pub instances: Option<String>,
    pub bind_address: Option<String>,
}

/// Read `path` (or start from defaults), apply `overrides`, then validate.
pub fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> Result<BalancerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => BalancerConfig::default(),
    };

    if let Some(raw) = &overrides.instances {
        config.instances.list = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        config.instances.file = None;
    }
    if let Some(bind) = &overrides.bind_address {
        config.listener.bind_address = bind.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Everything needed to serve, built from one configuration.
pub struct Components {
    pub registry: Arc<InstanceRegistry>,
    pub breaker: Arc<CircuitBreaker>,
    pub forwarder: Forwarder,
    pub source: Arc<dyn InstanceSource>,
    pub instance_file: Option<PathBuf>,
}

/// Seed the registry and wire the forwarding core.
pub async fn build_components(config: &BalancerConfig) -> Result<Components, StartupError> {
    let source: Arc<dyn InstanceSource> = match &config.instances.file {
        Some(path) => Arc::new(FileSource::new(path.clone())),
        None => Arc::new(StaticSource::new(&config.instances.list)),
    };

    let initial = source.load().await?;
    tracing::info!(
        source = %source.describe(),
        count = initial.len(),
        "Initial instances loaded"
    );
    metrics::record_instance_count(initial.len());

    let registry = Arc::new(InstanceRegistry::new(initial)?);
    let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.open_window()));
    let transport = Arc::new(HttpTransport::new(
        &config.timeouts,
        config.forwarding.max_body_bytes,
    ));
    let forwarder = Forwarder::new(
        registry.clone(),
        breaker.clone(),
        transport,
        config.forwarding.exhaustion_policy,
    );

    Ok(Components {
        registry,
        breaker,
        forwarder,
        source,
        instance_file: config.instances.file.clone(),
    })
}

/// Start the background refresher for file sources.
///
/// Returns the file watcher handle when one was started; dropping it stops
/// change notifications.
fn spawn_refresher(
    config: &BalancerConfig,
    components: &Components,
    shutdown: &Shutdown,
) -> Result<Option<RecommendedWatcher>, StartupError> {
    let Some(path) = &components.instance_file else {
        return Ok(None);
    };

    let mut refresher = InstanceRefresher::new(
        components.source.clone(),
        components.registry.clone(),
        config.instances.refresh_interval(),
    )
    .with_breaker(components.breaker.clone());

    let watcher = if config.instances.watch_file {
        let (watcher, changes) = InstanceFileWatcher::new(path);
        let handle = watcher.run()?;
        refresher = refresher.with_trigger(changes);
        Some(handle)
    } else {
        None
    };

    tokio::spawn(refresher.run(shutdown.subscribe()));
    Ok(watcher)
}

/// Run the balancer until SIGINT or SIGTERM.
pub async fn run(config: BalancerConfig) -> Result<(), StartupError> {
    // The recorder must exist before `build_components` sets the instance gauge.
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let components = build_components(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let shutdown = Arc::new(Shutdown::new());
    let _watcher = spawn_refresher(&config, &components, &shutdown)?;
    spawn_signal_listener(shutdown.clone());

    tracing::info!(
        instances = components.registry.len(),
        open_window_secs = components.breaker.open_window().as_secs(),
        policy = ?components.forwarder.policy(),
        "Balancer ready"
    );

    let server = HttpServer::new(config, components.forwarder);
    let served = server.run(listener, shutdown.subscribe()).await;

    // Stops the refresher too when the server exits on its own.
    shutdown.trigger("server stopped");
    served.map_err(StartupError::Serve)
}
