//! Per-instance circuit breaker.
//!
//! # States
//! - Closed: no failure recorded, instance eligible for selection
//! - Open: failure recorded less than `open_window` ago, instance skipped
//!
//! # State Transitions
//! ```text
//! Closed → Open: forwarding attempt to the instance fails
//! Open → Open: another failure overwrites the timestamp (most recent wins)
//! Open → Closed: first `is_open` check after the window has elapsed removes the entry
//! ```
//!
//! # Design Decisions
//! - Per-instance, keyed by address (not global)
//! - The map only caches recent failures; expired entries are dropped on read
//! - No background sweeper: the breaker heals purely from read-time checks
//! - Timestamps are passed in by the caller so behaviour is deterministic under test

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::load_balancer::Instance;

/// Default cooldown after a failure.
pub const DEFAULT_OPEN_WINDOW: Duration = Duration::from_secs(10);

/// Tracks the most recent failure time of every instance with an open circuit.
#[derive(Debug)]
pub struct CircuitBreaker {
    failures: DashMap<Instance, Instant>,
    open_window: Duration,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_WINDOW)
    }
}

impl CircuitBreaker {
    pub fn new(open_window: Duration) -> Self {
        Self {
            failures: DashMap::new(),
            open_window,
        }
    }

    /// The configured cooldown.
    pub fn open_window(&self) -> Duration {
        self.open_window
    }

    /// Mark `instance` as failed at `at`, replacing any earlier failure.
    pub fn record_failure(&self, instance: &Instance, at: Instant) {
        self.failures.insert(instance.clone(), at);
        tracing::debug!(instance = %instance, window = ?self.open_window, "Circuit opened");
    }

    /// Returns true iff a failure is recorded and `now - recorded < open_window`.
    ///
    /// An expired entry is removed before returning false.
    pub fn is_open(&self, instance: &Instance, now: Instant) -> bool {
        let Some(failed_at) = self.failures.get(instance).map(|entry| *entry.value()) else {
            return false;
        };

        if !self.expired(failed_at, now) {
            return true;
        }

        // Conditional remove: a fresher failure recorded in between must survive.
        let removed = self
            .failures
            .remove_if(instance, |_, at| self.expired(*at, now))
            .is_some();
        if removed {
            tracing::info!(instance = %instance, "Circuit closed");
            return false;
        }

        // Lost the race to a concurrent `record_failure`; re-read it.
        self.failures
            .get(instance)
            .map(|entry| !self.expired(*entry.value(), now))
            .unwrap_or(false)
    }

    /// Most recent recorded failure, if the entry has not been cleaned up yet.
    pub fn last_failure(&self, instance: &Instance) -> Option<Instant> {
        self.failures.get(instance).map(|entry| *entry.value())
    }

    /// Instances whose circuit is open at `now`, with the cooldown left.
    ///
    /// Read-only: expired entries are left for `is_open` to clean up.
    pub fn open_instances(&self, now: Instant) -> Vec<(Instance, Duration)> {
        let mut open: Vec<(Instance, Duration)> = self
            .failures
            .iter()
            .filter_map(|entry| {
                let elapsed = now.saturating_duration_since(*entry.value());
                self.open_window
                    .checked_sub(elapsed)
                    .filter(|remaining| !remaining.is_zero())
                    .map(|remaining| (entry.key().clone(), remaining))
            })
            .collect();
        open.sort_by(|a, b| a.0.cmp(&b.0));
        open
    }

    /// Drop entries for instances not in `current`.
    ///
    /// Called after a registry replace; removed instances are never queried
    /// again, so their entries would otherwise never expire. Returns how many
    /// were dropped.
    pub fn retain_instances(&self, current: &[Instance]) -> usize {
        let before = self.failures.len();
        self.failures.retain(|instance, _| current.contains(instance));
        let dropped = before.saturating_sub(self.failures.len());
        if dropped > 0 {
            tracing::debug!(dropped, "Pruned circuit entries for removed instances");
        }
        dropped
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    fn expired(&self, failed_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(failed_at) >= self.open_window
    }
}
