//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Forward request
//!     → registry.rs (snapshot of instances + shared cursor)
//!     → round_robin.rs (advance cursor, skip open circuits)
//!     → resilience::circuit_breaker (is the candidate cooling down?)
//!     → Return eligible instance or None
//! ```
//!
//! # Design Decisions
//! - Registry owns all shared selection state; the selector is stateless
//! - Snapshots are swapped whole, never mutated in place
//! - Open-circuit instances excluded from selection
//! - Empty instance lists are rejected, not installed

use thiserror::Error;

pub mod instance;
pub mod registry;
pub mod round_robin;

pub use instance::{parse_instance_list, Instance};
pub use registry::{InstanceRegistry, Snapshot};
pub use round_robin::RoundRobin;

/// Errors raised by the load balancing core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalancerError {
    /// No instances configured, or an update carried an empty list.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
