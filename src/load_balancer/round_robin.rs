//! Round-robin selection over the registry, skipping open circuits.

use std::sync::Arc;
use std::time::Instant;

use crate::load_balancer::{registry::InstanceRegistry, Instance};
use crate::observability::metrics;
use crate::resilience::CircuitBreaker;

/// Round-robin selector.
/// Rotates the registry cursor and returns the first candidate whose circuit is closed.
#[derive(Debug, Clone)]
pub struct RoundRobin {
    registry: Arc<InstanceRegistry>,
    breaker: Arc<CircuitBreaker>,
}

impl RoundRobin {
    pub fn new(registry: Arc<InstanceRegistry>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { registry, breaker }
    }

    /// Next eligible instance, or `None` when `max_attempts` consecutive
    /// candidates (capped at the snapshot size) all have open circuits.
    pub fn next_eligible(&self, max_attempts: usize) -> Option<Instance> {
        self.next_eligible_at(max_attempts, Instant::now())
    }

    /// As [`RoundRobin::next_eligible`], evaluating circuits at `now`.
    pub fn next_eligible_at(&self, max_attempts: usize, now: Instant) -> Option<Instance> {
        let snapshot = self.registry.snapshot();
        let bound = max_attempts.min(snapshot.len());

        // Skipped candidates still consume a cursor advance.
        for _ in 0..bound {
            let index = self.registry.advance_within(&snapshot);
            let candidate = &snapshot[index];
            if self.breaker.is_open(candidate, now) {
                tracing::warn!(instance = %candidate, "Instance is in circuit breaker mode, skipping");
                metrics::record_circuit_skip();
                continue;
            }
            return Some(candidate.clone());
        }

        tracing::debug!(checked = bound, "No eligible instance, all circuits open");
        None
    }
}
