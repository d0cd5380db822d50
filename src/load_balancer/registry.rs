//! Instance registry.
//!
//! # Responsibilities
//! - Hold the active, ordered instance snapshot
//! - Own the shared rotation cursor
//! - Swap the snapshot atomically on refresh
//!
//! # Design Decisions
//! - Snapshot behind `ArcSwap` so readers never take a lock
//! - Cursor is a single `AtomicUsize`; every advance hands out a distinct raw value
//! - Cursor is never reset on replace; it is reduced modulo the snapshot in use

use arc_swap::ArcSwap;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::instance::{dedup_instances, Instance};
use crate::load_balancer::BalancerError;

/// An immutable view of the instance list as of a point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    instances: Arc<Vec<Instance>>,
}

impl Snapshot {
    /// The instances in round-robin order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }
}

impl Deref for Snapshot {
    type Target = [Instance];
    fn deref(&self) -> &Self::Target {
        &self.instances
    }
}

/// Holds the current instance snapshot and the rotation cursor.
#[derive(Debug)]
pub struct InstanceRegistry {
    snapshot: ArcSwap<Vec<Instance>>,
    cursor: AtomicUsize,
}

impl InstanceRegistry {
    /// Create a registry. An empty list is a configuration error.
    pub fn new(instances: Vec<Instance>) -> Result<Self, BalancerError> {
        let instances = non_empty(instances)?;
        Ok(Self {
            snapshot: ArcSwap::from_pointee(instances),
            cursor: AtomicUsize::new(0),
        })
    }

    /// Atomically install a new snapshot.
    ///
    /// Fails with [`BalancerError::InvalidConfiguration`] if `instances` is
    /// empty, in which case the previous snapshot stays active.
    pub fn replace(&self, instances: Vec<Instance>) -> Result<(), BalancerError> {
        let instances = non_empty(instances)?;
        let count = instances.len();
        let previous = self.snapshot.swap(Arc::new(instances));
        tracing::info!(
            previous = previous.len(),
            current = count,
            "Instance snapshot replaced"
        );
        Ok(())
    }

    /// Current snapshot, stable for the duration of one selection cycle.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            instances: self.snapshot.load_full(),
        }
    }

    /// Number of instances in the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Always false for a constructed registry; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// Advance the cursor and return its position within the current snapshot.
    pub fn advance(&self) -> usize {
        self.advance_within(&self.snapshot())
    }

    /// Advance the cursor and return its position within `snapshot`.
    pub fn advance_within(&self, snapshot: &Snapshot) -> usize {
        let raw = self.cursor.fetch_add(1, Ordering::Relaxed);
        // Snapshots are never empty, see `non_empty`.
        raw % snapshot.len().max(1)
    }

    /// Raw cursor value. Diagnostics only.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

fn non_empty(instances: Vec<Instance>) -> Result<Vec<Instance>, BalancerError> {
    let instances = dedup_instances(instances);
    if instances.is_empty() {
        return Err(BalancerError::InvalidConfiguration(
            "instance list cannot be empty".to_string(),
        ));
    }
    Ok(instances)
}
