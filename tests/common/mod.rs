//! Shared utilities for integration and load testing.

use axum::http::StatusCode;
use roundrobin_proxy::config::BalancerConfig;
use roundrobin_proxy::lifecycle::startup::build_components;
use roundrobin_proxy::lifecycle::Shutdown;
use roundrobin_proxy::{HttpServer, InstanceRegistry};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Start a simple mock backend that returns a fixed response.
#[allow(dead_code)]
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    start_programmable_backend(addr, move |_body| async move { (200, response.to_string()) }).await;
}

/// Start a mock backend whose status and body are computed from the request body.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let body = read_request_body(&mut socket).await;
                        let (status, body) = f(body).await;
                        let reason = StatusCode::from_u16(status)
                            .ok()
                            .and_then(|s| s.canonical_reason())
                            .unwrap_or("Unknown");

                        let response_str = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Read one HTTP/1.1 request and return its body.
async fn read_request_body(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::new(),
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = header_end + 4;
        if buf.len() >= body_start + content_length {
            return String::from_utf8_lossy(&buf[body_start..body_start + content_length]).into_owned();
        }
    }
}

/// Start the balancer on `proxy_addr` in front of `instances`.
///
/// `tweak` runs on the config before the components are built.
pub async fn start_proxy(
    proxy_addr: SocketAddr,
    instances: &[SocketAddr],
    tweak: impl FnOnce(&mut BalancerConfig),
) -> (Shutdown, Arc<InstanceRegistry>) {
    let mut config = BalancerConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.instances.list = instances.iter().map(|a| format!("http://{a}/")).collect();
    tweak(&mut config);

    let components = build_components(&config).await.unwrap();
    let registry = components.registry.clone();

    let shutdown = Shutdown::new();
    let listener = TcpListener::bind(proxy_addr).await.unwrap();
    let server = HttpServer::new(config, components.forwarder);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (shutdown, registry)
}

/// Client without pooling or proxy settings from the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// An address nothing listens on.
#[allow(dead_code)]
pub fn dead_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}
