//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the balancer endpoints
//! - Wire up middleware (tracing, body limit, request ID, request timeout)
//! - Bind server to listener
//! - Hand inbound payloads to the forwarder
//! - Report registry and circuit breaker state

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::BalancerConfig;
use crate::forwarding::{ExhaustionPolicy, Forwarder};
use crate::http::request::{request_id, UuidRequestId};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Forwarder,
    /// Budget for one `/roundrobin` call, retries included.
    pub request_timeout: Duration,
}

/// HTTP front end of the balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `forwarder`.
    pub fn new(config: BalancerConfig, forwarder: Forwarder) -> Self {
        let state = AppState {
            forwarder,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The forward deadline lives in the handler so expiry still yields a
    /// structured result. The outer `TimeoutLayer` only bounds slow inbound
    /// bodies and fires one second later.
    #[allow(deprecated)]
    fn build_router(config: &BalancerConfig, state: AppState) -> Router {
        Router::new()
            .route("/roundrobin", post(forward_handler))
            .route("/status", get(status_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.forwarding.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs + 1)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The router, for serving without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.timeouts.request_secs,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }
}

/// Forward the request body to the next available instance.
async fn forward_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers).to_string();
    let span = tracing::info_span!("forward", request_id = %request_id);

    match state
        .forwarder
        .forward_within(body, state.request_timeout)
        .instrument(span)
        .await
    {
        Ok(response) => {
            tracing::debug!(
                request_id = %request_id,
                status = %response.status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Forwarded request"
            );
            response.into_response()
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                attempts = e.attempt_count(),
                error = %e,
                "Forwarding failed"
            );
            e.into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenCircuit {
    instance: String,
    remaining_ms: u64,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    instances: Vec<String>,
    cursor: usize,
    open_window_secs: u64,
    exhaustion_policy: ExhaustionPolicy,
    open_circuits: Vec<OpenCircuit>,
}

/// Current instance list and which circuits are open.
async fn status_handler(State(state): State<AppState>) -> Json<StatusBody> {
    let forwarder = &state.forwarder;
    let snapshot = forwarder.registry().snapshot();
    let open_circuits = forwarder
        .breaker()
        .open_instances(Instant::now())
        .into_iter()
        .map(|(instance, remaining)| OpenCircuit {
            instance: instance.to_string(),
            remaining_ms: remaining.as_millis() as u64,
        })
        .collect();

    Json(StatusBody {
        instances: snapshot.iter().map(ToString::to_string).collect(),
        cursor: forwarder.registry().cursor(),
        open_window_secs: forwarder.breaker().open_window().as_secs(),
        exhaustion_policy: forwarder.policy(),
        open_circuits,
    })
}

async fn health_handler() -> &'static str {
    "ok"
}
