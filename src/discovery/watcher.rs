//! Instance file watcher for early refresh.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Monitors the instance file and signals the refresher when it changes.
///
/// The watcher only signals; reading and validating the file stays with
/// [`FileSource`](crate::discovery::FileSource) so both paths share one parser.
pub struct InstanceFileWatcher {
    path: PathBuf,
    change_tx: mpsc::UnboundedSender<()>,
}

impl InstanceFileWatcher {
    /// Create a new InstanceFileWatcher.
    ///
    /// Returns the watcher and a receiver of change notifications.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned handle must be kept alive for as long as notifications are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::debug!(paths = ?event.paths, "Instance file event");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Instance file watcher started");
        Ok(watcher)
    }
}
