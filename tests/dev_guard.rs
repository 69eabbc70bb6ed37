//! Share routes fronted by the development remote guard.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use tokio::net::TcpListener;

use mailshare_gate::config::GateConfig;
use mailshare_gate::guard::{OutcomeCode, Stage};

mod common;
use common::{get, harness_with_dev_guard, share};

/// Endpoint that accepts and immediately drops every connection, counting them.
async fn dropping_endpoint() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });
    (format!("http://{addr}"), connections)
}

#[tokio::test]
async fn test_malformed_token_skips_remote_call() {
    let (endpoint, connections) = dropping_endpoint().await;
    let h = harness_with_dev_guard(GateConfig::default(), &endpoint);

    let res = get(&h.router, "/share/short-token!").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(&res.body[..], b"Not Found");

    let entries = h.log_entries(1).await;
    assert_eq!(h.access_log.len(), 1);
    assert_eq!(entries[0].outcome, OutcomeCode::MalformedToken);
    assert_eq!(entries[0].stage, Some(Stage::FormatCheck));
    assert_eq!(connections.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remote_denial_is_logged_once() {
    let (endpoint, connections) = dropping_endpoint().await;
    let h = harness_with_dev_guard(GateConfig::default(), &endpoint);
    let record = h.seed(share("guarded@example.com")).await;

    let res = get(&h.router, &format!("/share/{}", record.token)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(&res.body[..], b"Not Found");

    let entries = h.log_entries(1).await;
    assert_eq!(h.access_log.len(), 1);
    assert_eq!(entries[0].outcome, OutcomeCode::NotFound);
    assert_eq!(entries[0].stage, Some(Stage::DevGuard));
    assert!(entries[0].fault.is_some());
    assert!(entries[0].request_id.is_some());
    assert!(connections.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_remote_denial_matches_local_denial_bytes() {
    let (endpoint, _connections) = dropping_endpoint().await;
    let h = harness_with_dev_guard(GateConfig::default(), &endpoint);
    let record = h.seed(share("guarded@example.com")).await;

    let remote = get(&h.router, &format!("/share/{}", record.token)).await;
    let local = get(&h.router, "/share/bad").await;
    assert_eq!(remote.status, local.status);
    assert_eq!(remote.headers, local.headers);
    assert_eq!(remote.body, local.body);
}
