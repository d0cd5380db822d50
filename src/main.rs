//! Round-robin forwarding proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                 ROUND-ROBIN PROXY                │
//!                       │                                                  │
//!   POST /roundrobin    │  ┌─────────┐    ┌────────────┐    ┌───────────┐  │
//!   ────────────────────┼─▶│  http   │───▶│ forwarding │───▶│ transport │──┼──▶ Instance
//!                       │  │ server  │    │ (retries)  │    │  (hyper)  │  │
//!                       │  └─────────┘    └─────┬──────┘    └───────────┘  │
//!                       │                       │                          │
//!                       │             ┌─────────┴─────────┐                │
//!                       │             ▼                   ▼                │
//!                       │     ┌──────────────┐    ┌───────────────┐        │
//!                       │     │load_balancer │    │  resilience   │        │
//!                       │     │ registry +   │    │circuit breaker│        │
//!                       │     │ round robin  │    └───────────────┘        │
//!                       │     └──────▲───────┘                             │
//!                       │            │ replace                             │
//!                       │     ┌──────┴───────┐                             │
//!                       │     │  discovery   │  (file source, refresher)   │
//!                       │     └──────────────┘                             │
//!                       └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use roundrobin_proxy::lifecycle::startup::{self, Overrides};
use roundrobin_proxy::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "roundrobin-proxy", version, about = "Round-robin request forwarder")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "ROUNDROBIN_CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated instance URLs, replacing the configured list.
    #[arg(short, long, env = "APPLICATION_INSTANCES")]
    instances: Option<String>,

    /// Listener address, e.g. 0.0.0.0:8080.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = Overrides {
        instances: cli.instances,
        bind_address: cli.bind,
    };
    let config = match startup::resolve_config(cli.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            // Logging is configured from the file, so report config errors directly.
            logging::init("info");
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!("roundrobin-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        instance_file = ?config.instances.file,
        static_instances = config.instances.list.len(),
        open_window_secs = config.circuit_breaker.open_window_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
