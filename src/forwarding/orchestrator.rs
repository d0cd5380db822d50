//! Retry-forwarding loop.
//!
//! # Responsibilities
//! - Bound retries by the instance count captured at call start
//! - Stop at the first successful response
//! - Record every failed attempt in the circuit breaker
//! - Produce one terminal error per the configured [`ExhaustionPolicy`]
//!
//! # Design Decisions
//! - No backoff between attempts: each retry goes to a different instance
//! - Dropping the returned future cancels the in-flight call and any further
//!   retries; failures already recorded stay recorded

use axum::body::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;

use crate::forwarding::{Attempt, ExhaustionPolicy, ForwardError};
use crate::load_balancer::{InstanceRegistry, RoundRobin};
use crate::observability::metrics;
use crate::resilience::CircuitBreaker;
use crate::transport::{BackendResponse, Transport};

/// Drives selection, transport calls and breaker updates for each request.
#[derive(Clone)]
pub struct Forwarder {
    registry: Arc<InstanceRegistry>,
    breaker: Arc<CircuitBreaker>,
    selector: RoundRobin,
    transport: Arc<dyn Transport>,
    policy: ExhaustionPolicy,
}

impl Forwarder {
    pub fn new(
        registry: Arc<InstanceRegistry>,
        breaker: Arc<CircuitBreaker>,
        transport: Arc<dyn Transport>,
        policy: ExhaustionPolicy,
    ) -> Self {
        let selector = RoundRobin::new(registry.clone(), breaker.clone());
        Self {
            registry,
            breaker,
            selector,
            transport,
            policy,
        }
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn policy(&self) -> ExhaustionPolicy {
        self.policy
    }

    /// Forward `payload` to the first instance that answers successfully.
    pub async fn forward(&self, payload: Bytes) -> Result<BackendResponse, ForwardError> {
        self.forward_until(payload, None).await
    }

    /// As [`Forwarder::forward`], giving up once `limit` has elapsed.
    ///
    /// Expiry yields [`ForwardError::AllInstancesUnavailable`] carrying the
    /// attempts that completed; the attempt cut short is not recorded.
    pub async fn forward_within(&self, payload: Bytes, limit: Duration) -> Result<BackendResponse, ForwardError> {
        self.forward_until(payload, Some(time::Instant::now() + limit)).await
    }

    async fn forward_until(
        &self,
        payload: Bytes,
        deadline: Option<time::Instant>,
    ) -> Result<BackendResponse, ForwardError> {
        let start = Instant::now();
        // Captured once so a concurrent refresh cannot change the retry bound.
        let max_attempts = self.registry.len();
        let mut attempts: Vec<Attempt> = Vec::new();

        while attempts.len() < max_attempts {
            let Some(instance) = self.selector.next_eligible(max_attempts) else {
                tracing::warn!(attempts = attempts.len(), "No eligible instance left");
                break;
            };

            tracing::info!(instance = %instance, attempt = attempts.len() + 1, "Forwarding request");

            let call = self.transport.send(&instance, payload.clone());
            let result = match deadline {
                Some(deadline) => match time::timeout_at(deadline, call).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(
                            instance = %instance,
                            attempts = attempts.len(),
                            "Request deadline reached, abandoning in-flight attempt"
                        );
                        metrics::record_forward("deadline", attempts.len(), start);
                        return Err(ForwardError::AllInstancesUnavailable { attempts });
                    }
                },
                None => call.await,
            };

            match result {
                Ok(response) => {
                    tracing::debug!(instance = %instance, status = %response.status, "Forward succeeded");
                    metrics::record_forward("success", attempts.len() + 1, start);
                    return Ok(response);
                }
                Err(error) => {
                    tracing::error!(instance = %instance, error = %error, "Failed to forward request");
                    self.breaker.record_failure(&instance, Instant::now());
                    metrics::record_attempt_failure(&instance);
                    attempts.push(Attempt { instance, error });

                    if attempts.len() < max_attempts {
                        tracing::info!(attempt = attempts.len(), "Retrying with the next instance");
                    }
                }
            }
        }

        tracing::error!(attempts = attempts.len(), "All instances failed");
        metrics::record_forward("exhausted", attempts.len(), start);
        Err(ForwardError::exhausted(self.policy, attempts))
    }
}
