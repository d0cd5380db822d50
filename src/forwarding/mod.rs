//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound payload
//!     → orchestrator.rs (capture attempt budget = instance count)
//!     → load_balancer::RoundRobin (next eligible instance)
//!     → transport::Transport (send)
//!         → success: return backend response
//!         → failure: record in circuit breaker, select again
//!     → exhausted: outcome.rs (ForwardError per ExhaustionPolicy)
//! ```
//!
//! # State Machine (one forward call)
//! ```text
//! SELECTING → CALLING → SUCCESS
//!                    → FAILED → SELECTING
//! SELECTING → EXHAUSTED (no eligible instance or budget spent)
//! ```

use serde::{Deserialize, Serialize};

pub mod orchestrator;
pub mod outcome;

pub use orchestrator::Forwarder;
pub use outcome::{Attempt, ForwardError};

/// What `forward` returns once every attempt has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Structured "all instances unavailable" result carrying the attempt count.
    #[default]
    ReturnUnavailable,
    /// Surface the last transport error when at least one attempt was made.
    RaiseLastError,
}
