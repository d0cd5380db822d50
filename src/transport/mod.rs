//! Outbound transport subsystem.
//!
//! # Data Flow
//! ```text
//! forwarding::orchestrator picks an instance
//!     → Transport::send(instance, payload)
//!     → http.rs (POST via hyper-util client, connect + read deadlines)
//!     → BackendResponse (2xx) or TransportError (anything else)
//! ```
//!
//! # Design Decisions
//! - Transport is a trait so the forwarding core can run against any client
//! - Non-2xx responses are failures, same as connection errors and timeouts
//! - Response bodies are buffered so a failed read counts against the attempt

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use std::time::Duration;
use thiserror::Error;

use crate::load_balancer::Instance;

pub mod http;

pub use http::HttpTransport;

/// A successful response from a backend instance.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BackendResponse {
    /// Build a 200 response with the given body and no headers.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// A single forwarding attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The instance address cannot be turned into a request target.
    #[error("Invalid instance address {instance}: {reason}")]
    InvalidInstance { instance: String, reason: String },

    /// Connection refused, reset, DNS failure and similar.
    #[error("Connection error: {0}")]
    Connect(String),

    /// No complete response within the deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-2xx status.
    #[error("Backend returned {0}")]
    Status(StatusCode),

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Sends one payload to one instance.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, instance: &Instance, payload: Bytes) -> Result<BackendResponse, TransportError>;
}
