//! Instance discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Every refresh_interval (refresher.rs ticker)
//!   or instance file changed (watcher.rs, optional)
//!     → source.rs (static list or file, parsed + validated)
//!     → InstanceRegistry::replace (atomic swap)
//!     → on empty/unreadable list: keep previous snapshot, log error
//! ```
//!
//! # Design Decisions
//! - Refresh is a background task owned by lifecycle, not by the forwarding core
//! - Fails closed: a bad update never empties the registry
//! - Stops on the shared shutdown broadcast

use std::path::PathBuf;
use thiserror::Error;

use crate::load_balancer::BalancerError;

pub mod refresher;
pub mod source;
pub mod watcher;

pub use refresher::{InstanceRefresher, Refreshed};
pub use source::{FileSource, InstanceSource, StaticSource};
pub use watcher::InstanceFileWatcher;

/// Failure to obtain an instance list.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No instance URLs found in {0}")]
    Empty(String),
}

/// Failure of one refresh cycle. The registry is left untouched.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Instance list rejected: {0}")]
    Rejected(#[from] BalancerError),
}
