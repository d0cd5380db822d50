//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to instance:
//!     → timeouts.rs (enforce connect/read deadline)
//!     → On failure: circuit_breaker.rs (record failure time, exclude instance)
//!     → forwarding::orchestrator retries on the next eligible instance
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - Every transport failure is treated alike for retry purposes
//! - Circuit breaker keeps retries off instances that just failed

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, DEFAULT_OPEN_WINDOW};
