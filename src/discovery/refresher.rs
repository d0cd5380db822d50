//! Periodic instance list refresh.
//!
//! # Responsibilities
//! - Pull the instance list from a source on a fixed interval
//! - Optionally refresh early when the watcher reports a file change
//! - Push non-empty lists into the registry; keep the old snapshot otherwise

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::discovery::{InstanceSource, RefreshError};
use crate::load_balancer::InstanceRegistry;
use crate::resilience::CircuitBreaker;
use crate::observability::metrics;

/// Result of one successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refreshed {
    /// A new snapshot with this many instances was installed.
    Replaced(usize),
    /// The source returned the list already in use.
    Unchanged,
}

pub struct InstanceRefresher {
    source: Arc<dyn InstanceSource>,
    registry: Arc<InstanceRegistry>,
    interval: Duration,
    trigger: Option<mpsc::UnboundedReceiver<()>>,
    breaker: Option<Arc<CircuitBreaker>>,
}

impl InstanceRefresher {
    pub fn new(source: Arc<dyn InstanceSource>, registry: Arc<InstanceRegistry>, interval: Duration) -> Self {
        Self {
            source,
            registry,
            interval,
            trigger: None,
            breaker: None,
        }
    }

    /// Prune `breaker` entries for instances a refresh removes.
    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Also refresh whenever a message arrives on `trigger`.
    pub fn with_trigger(mut self, trigger: mpsc::UnboundedReceiver<()>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Load from the source once and install the result.
    ///
    /// On any error the registry keeps its current snapshot.
    pub async fn refresh_once(&self) -> Result<Refreshed, RefreshError> {
        let instances = self.source.load().await?;

        if self.registry.snapshot().instances() == instances.as_slice() {
            tracing::debug!(source = %self.source.describe(), "Instance list unchanged");
            return Ok(Refreshed::Unchanged);
        }

        let count = instances.len();
        self.registry.replace(instances)?;
        if let Some(breaker) = &self.breaker {
            breaker.retain_instances(self.registry.snapshot().instances());
        }
        metrics::record_instance_count(count);
        Ok(Refreshed::Replaced(count))
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            source = %self.source.describe(),
            interval = ?self.interval,
            "Instance refresher starting"
        );

        // The registry was seeded at startup, so the first tick is one interval out.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let triggered = async {
                match self.trigger.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            };

            let mut trigger_closed = false;
            tokio::select! {
                _ = ticker.tick() => {}
                msg = triggered => {
                    if msg.is_some() {
                        tracing::info!("Instance file change detected, refreshing");
                    } else {
                        trigger_closed = true;
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Instance refresher received shutdown signal, exiting loop");
                    break;
                }
            }

            if trigger_closed {
                tracing::debug!("Refresh trigger closed");
                self.trigger = None;
                continue;
            }

            match self.refresh_once().await {
                Ok(Refreshed::Replaced(count)) => {
                    tracing::info!(count, source = %self.source.describe(), "Instance list refreshed");
                }
                Ok(Refreshed::Unchanged) => {}
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        kept = self.registry.len(),
                        "Instance refresh failed, keeping current instances"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::SourceError;
    use crate::load_balancer::Instance;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns queued responses in order, then repeats the last one.
    struct QueuedSource {
        queue: Mutex<Vec<Result<Vec<Instance>, SourceError>>>,
    }

    impl QueuedSource {
        fn new(mut responses: Vec<Result<Vec<Instance>, SourceError>>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                queue: Mutex::new(responses),
            })
        }
    }

    #[async_trait]
    impl InstanceSource for QueuedSource {
        async fn load(&self) -> Result<Vec<Instance>, SourceError> {
            let mut queue = self.queue.lock().unwrap();
            if queue.len() > 1 {
                queue.pop().unwrap()
            } else {
                match queue.last().unwrap() {
                    Ok(list) => Ok(list.clone()),
                    Err(_) => Err(SourceError::Empty("queued".into())),
                }
            }
        }

        fn describe(&self) -> String {
            "queued".into()
        }
    }

    fn list(addrs: &[&str]) -> Vec<Instance> {
        addrs.iter().map(|a| Instance::new(*a)).collect()
    }

    fn registry(addrs: &[&str]) -> Arc<InstanceRegistry> {
        Arc::new(InstanceRegistry::new(list(addrs)).unwrap())
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let reg = registry(&["a", "b", "c"]);
        let source = QueuedSource::new(vec![Ok(list(&["x", "y"]))]);
        let refresher = InstanceRefresher::new(source, reg.clone(), Duration::from_secs(10));

        assert_eq!(refresher.refresh_once().await.unwrap(), Refreshed::Replaced(2));
        assert_eq!(reg.snapshot().instances(), &list(&["x", "y"])[..]);
    }

    #[tokio::test]
    async fn test_refresh_unchanged() {
        let reg = registry(&["a", "b"]);
        let source = QueuedSource::new(vec![Ok(list(&["a", "b"]))]);
        let refresher = InstanceRefresher::new(source, reg, Duration::from_secs(10));

        assert_eq!(refresher.refresh_once().await.unwrap(), Refreshed::Unchanged);
    }

    #[tokio::test]
    async fn test_source_error_keeps_snapshot() {
        let reg = registry(&["a", "b"]);
        let source = QueuedSource::new(vec![Err(SourceError::Empty("queued".into()))]);
        let refresher = InstanceRefresher::new(source, reg.clone(), Duration::from_secs(10));

        let err = refresher.refresh_once().await.unwrap_err();
        assert!(matches!(err, RefreshError::Source(SourceError::Empty(_))));
        assert_eq!(reg.snapshot().instances(), &list(&["a", "b"])[..]);
    }

    #[tokio::test]
    async fn test_empty_list_rejected_by_registry() {
        let reg = registry(&["a"]);
        let source = QueuedSource::new(vec![Ok(Vec::new())]);
        let refresher = InstanceRefresher::new(source, reg.clone(), Duration::from_secs(10));

        let err = refresher.refresh_once().await.unwrap_err();
        assert!(matches!(err, RefreshError::Rejected(_)));
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_refreshes_on_interval_until_shutdown() {
        let reg = registry(&["a"]);
        let source = QueuedSource::new(vec![Ok(list(&["b"])), Ok(list(&["c", "d"]))]);
        let refresher = InstanceRefresher::new(source, reg.clone(), Duration::from_secs(10));

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(refresher.run(rx));

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(reg.snapshot().instances(), &list(&["a"])[..]);

        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(reg.snapshot().instances(), &list(&["b"])[..]);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(reg.snapshot().instances(), &list(&["c", "d"])[..]);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_refreshes_early() {
        let reg = registry(&["a"]);
        let source = QueuedSource::new(vec![Ok(list(&["z"]))]);
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let refresher =
            InstanceRefresher::new(source, reg.clone(), Duration::from_secs(3600)).with_trigger(trigger_rx);

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(refresher.run(rx));

        trigger_tx.send(()).unwrap();
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(reg.snapshot().instances(), &list(&["z"])[..]);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_prunes_removed_instances_from_breaker() {
        let reg = registry(&["a", "b"]);
        let breaker = Arc::new(CircuitBreaker::default());
        let now = std::time::Instant::now();
        breaker.record_failure(&Instance::new("a"), now);
        breaker.record_failure(&Instance::new("b"), now);

        let source = QueuedSource::new(vec![Ok(list(&["b", "c"]))]);
        let refresher =
            InstanceRefresher::new(source, reg.clone(), Duration::from_secs(10)).with_breaker(breaker.clone());

        assert_eq!(refresher.refresh_once().await.unwrap(), Refreshed::Replaced(2));
        assert_eq!(breaker.len(), 1);
        assert!(breaker.last_failure(&Instance::new("b")).is_some());
    }
}
