//! HTTP transport backed by the hyper-util legacy client.

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;

use crate::config::TimeoutConfig;
use crate::load_balancer::Instance;
use crate::resilience::timeouts::with_deadline;
use crate::transport::{BackendResponse, Transport, TransportError};

const USER_AGENT: &str = concat!("roundrobin-proxy/", env!("CARGO_PKG_VERSION"));

/// Forwards payloads as `POST` requests with a JSON content type.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Body>,
    read_timeout: Duration,
    max_body_bytes: usize,
}

impl HttpTransport {
    /// Create a transport with the configured connect and read deadlines.
    pub fn new(timeouts: &TimeoutConfig, max_body_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            read_timeout: Duration::from_secs(timeouts.read_secs),
            max_body_bytes,
        }
    }

    fn build_request(&self, instance: &Instance, payload: Bytes) -> Result<Request<Body>, TransportError> {
        let invalid = |reason: String| TransportError::InvalidInstance {
            instance: instance.to_string(),
            reason,
        };

        let uri: Uri = instance
            .address()
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| invalid(e.to_string()))?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(invalid("address must be an absolute http URL".to_string()));
        }

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::from(payload))
            .map_err(|e| invalid(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, instance: &Instance, payload: Bytes) -> Result<BackendResponse, TransportError> {
        let request = self.build_request(instance, payload)?;

        with_deadline(self.read_timeout, async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| TransportError::Connect(e.to_string()))?;

            let (parts, body) = response.into_parts();
            if !parts.status.is_success() {
                return Err(TransportError::Status(parts.status));
            }

            let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
                .await
                .map_err(|e| TransportError::Body(e.to_string()))?;

            Ok(BackendResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        })
        .await
    }
}
