//! Load testing for the balancer.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

mod common;

async fn counting_backend(addr: SocketAddr, name: &'static str) -> Arc<AtomicU32> {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    common::start_programmable_backend(addr, move |_| {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            (200, name.to_string())
        }
    })
    .await;
    calls
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distribution_is_even() {
    let b1: SocketAddr = "127.0.0.1:28201".parse().unwrap();
    let b2: SocketAddr = "127.0.0.1:28202".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28203".parse().unwrap();

    let b1_calls = counting_backend(b1, "b1").await;
    let b2_calls = counting_backend(b2, "b2").await;
    let (shutdown, registry) = common::start_proxy(proxy_addr, &[b1, b2], |_| {}).await;

    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();
    let mut handles = Vec::new();

    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{proxy_addr}/roundrobin");
        handles.push(tokio::spawn(async move {
            let mut ok = 0;
            for _ in 0..requests_per_task {
                let res = client.post(&url).body("{}").send().await.unwrap();
                if res.status().is_success() {
                    ok += 1;
                }
            }
            ok
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        succeeded += handle.await.unwrap();
    }
    let elapsed = start.elapsed();

    println!(
        "{} requests in {:?} ({:.0} req/s)",
        total_requests,
        elapsed,
        total_requests as f64 / elapsed.as_secs_f64()
    );

    assert_eq!(succeeded, total_requests);
    // Every request consumes exactly one cursor step while all instances are healthy.
    assert_eq!(registry.cursor(), total_requests);
    assert_eq!(b1_calls.load(Ordering::SeqCst), 250);
    assert_eq!(b2_calls.load(Ordering::SeqCst), 250);

    shutdown.trigger("test finished");
}
