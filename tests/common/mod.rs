//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use mailshare_gate::admin::{setup_admin_router, AdminState};
use mailshare_gate::audit::{AccessLogEntry, AccessLogger, MemorySink};
use mailshare_gate::config::{DevGuardConfig, GateConfig};
use mailshare_gate::guard::{AccessGuard, ShareLimitsCache};
use mailshare_gate::http::server::{share_router, AppState};
use mailshare_gate::lifecycle::Shutdown;
use mailshare_gate::security::remote::RemoteGuard;
use mailshare_gate::security::{MemoryCounterStore, RateLimiter};
use mailshare_gate::share::{
    Email, MemoryMailbox, MemoryShareStore, NewShare, ShareDefaults, ShareRecord, ShareRecordStore,
};

pub const ADMIN_KEY: &str = "test-admin-key";

/// Public and admin routers over in-memory stores the test can seed.
pub struct Harness {
    pub router: Router,
    pub admin: Router,
    pub shares: MemoryShareStore,
    pub mailboxes: MemoryMailbox,
    pub access_log: MemorySink,
    pub limits_cache: ShareLimitsCache,
    /// Dropping this stops the access log writer.
    pub shutdown: Shutdown,
}

pub fn harness(config: GateConfig) -> Harness {
    build(config, None)
}

/// Like [`harness`], with the share routes fronted by a remote guard.
pub fn harness_with_dev_guard(config: GateConfig, endpoint: &str) -> Harness {
    let remote = RemoteGuard::from_config(&DevGuardConfig {
        enabled: true,
        endpoint: endpoint.to_string(),
        timeout_ms: 500,
    })
    .unwrap();
    build(config, Some(Arc::new(remote)))
}

fn build(config: GateConfig, remote: Option<Arc<RemoteGuard>>) -> Harness {
    let shutdown = Shutdown::new();
    let shares = MemoryShareStore::new(None);
    let mailboxes = MemoryMailbox::new();
    let counters = MemoryCounterStore::new();
    let access_log = MemorySink::new(256);
    let limits_cache = ShareLimitsCache::new();

    let (logger, _writer) = AccessLogger::spawn(vec![Arc::new(access_log.clone())], shutdown.subscribe());
    let guard = Arc::new(AccessGuard::new(
        RateLimiter::new(Arc::new(counters.clone())),
        Arc::new(shares.clone()),
        limits_cache.clone(),
        config.guard_settings(),
    ));

    let router = share_router(
        AppState {
            guard,
            mailboxes: Arc::new(mailboxes.clone()),
            logger,
        },
        remote,
    );
    let admin = setup_admin_router(AdminState {
        shares: Arc::new(shares.clone()),
        limits_cache: limits_cache.clone(),
        counters: Arc::new(counters),
        access_log: access_log.clone(),
        share_defaults: config.share_defaults,
        api_key: Arc::from(ADMIN_KEY),
    });

    Harness {
        router,
        admin,
        shares,
        mailboxes,
        access_log,
        limits_cache,
        shutdown,
    }
}

impl Harness {
    /// Store `record` the way the admin API does, limits included.
    pub async fn seed(&self, record: ShareRecord) -> ShareRecord {
        self.shares.put(record.clone()).await.unwrap();
        self.limits_cache.remember(&record);
        record
    }

    /// Wait until the writer has flushed `count` entries, newest first.
    pub async fn log_entries(&self, count: usize) -> Vec<AccessLogEntry> {
        for _ in 0..200 {
            if self.access_log.len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.access_log.recent(count)
    }
}

/// A share with default limits and no restrictions.
pub fn share(mailbox: &str) -> ShareRecord {
    NewShare {
        mailbox: mailbox.to_string(),
        ..Default::default()
    }
    .into_record(&ShareDefaults::default(), Utc::now())
    .unwrap()
}

pub fn email(id: &str, subject: &str, received_at: DateTime<Utc>) -> Email {
    Email {
        id: id.to_string(),
        from: "noreply@service.example".to_string(),
        subject: subject.to_string(),
        text: String::new(),
        received_at,
    }
}

pub struct Captured {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> Captured {
    let response = router.clone().oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    Captured {
        status: parts.status,
        headers: parts.headers,
        body: body.collect().await.unwrap().to_bytes(),
    }
}

pub async fn get_from(router: &Router, uri: &str, ip: &str) -> Captured {
    let request = Request::get(uri)
        .header("cf-connecting-ip", ip)
        .header("user-agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0 Safari/537.36")
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}

pub async fn get(router: &Router, uri: &str) -> Captured {
    get_from(router, uri, "203.0.113.7").await
}

pub fn admin_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_KEY}"));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
