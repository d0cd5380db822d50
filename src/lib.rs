//! Round-robin request forwarding with a per-instance circuit breaker.

pub mod config;
pub mod discovery;
pub mod forwarding;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;
pub mod transport;

pub use config::schema::BalancerConfig;
pub use forwarding::{ExhaustionPolicy, ForwardError, Forwarder};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{Instance, InstanceRegistry, RoundRobin};
pub use resilience::CircuitBreaker;
pub use transport::{BackendResponse, HttpTransport, Transport, TransportError};
