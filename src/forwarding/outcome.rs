//! Per-request attempt records and terminal errors.

use thiserror::Error;

use crate::forwarding::ExhaustionPolicy;
use crate::load_balancer::Instance;
use crate::transport::TransportError;

/// One failed forwarding attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub instance: Instance,
    pub error: TransportError,
}

/// Terminal failure of a `forward` call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForwardError {
    /// Every eligible instance failed, or none was eligible.
    #[error("All instances are unavailable after {} attempts", .attempts.len())]
    AllInstancesUnavailable { attempts: Vec<Attempt> },

    /// The last transport error, raised under [`ExhaustionPolicy::RaiseLastError`].
    #[error("{source} (after {} attempts)", .attempts.len())]
    LastTransportError {
        source: TransportError,
        attempts: Vec<Attempt>,
    },
}

impl ForwardError {
    /// Build the terminal error for `attempts` under `policy`.
    ///
    /// With no attempts there is no error to raise, so both policies yield
    /// [`ForwardError::AllInstancesUnavailable`].
    pub fn exhausted(policy: ExhaustionPolicy, attempts: Vec<Attempt>) -> Self {
        match (policy, attempts.last()) {
            (ExhaustionPolicy::RaiseLastError, Some(last)) => Self::LastTransportError {
                source: last.error.clone(),
                attempts,
            },
            _ => Self::AllInstancesUnavailable { attempts },
        }
    }

    /// Number of instances actually called.
    pub fn attempt_count(&self) -> usize {
        self.attempts().len()
    }

    /// The failed attempts, in order.
    pub fn attempts(&self) -> &[Attempt] {
        match self {
            Self::AllInstancesUnavailable { attempts } => attempts,
            Self::LastTransportError { attempts, .. } => attempts,
        }
    }
}
