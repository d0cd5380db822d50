//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define balancer metrics (forwards, attempt failures, circuit skips)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-instance failure counts
//!
//! # Metrics
//! - `balancer_forward_total` (counter): forward calls by outcome (success, exhausted, deadline)
//! - `balancer_forward_attempts` (histogram): instances called per forward
//! - `balancer_forward_duration_seconds` (histogram): latency distribution
//! - `balancer_attempt_failures_total` (counter): failed attempts by instance
//! - `balancer_circuit_skips_total` (counter): candidates skipped on open circuit
//! - `balancer_instances` (gauge): size of the active snapshot
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels kept to outcome and instance address

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::load_balancer::Instance;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the end of one forward call.
pub fn record_forward(outcome: &'static str, attempts: usize, start: Instant) {
    ::metrics::counter!("balancer_forward_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("balancer_forward_attempts").record(attempts as f64);
    ::metrics::histogram!("balancer_forward_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_attempt_failure(instance: &Instance) {
    ::metrics::counter!("balancer_attempt_failures_total", "instance" => instance.to_string()).increment(1);
}

pub fn record_circuit_skip() {
    ::metrics::counter!("balancer_circuit_skips_total").increment(1);
}

pub fn record_instance_count(count: usize) {
    ::metrics::gauge!("balancer_instances").set(count as f64);
}
