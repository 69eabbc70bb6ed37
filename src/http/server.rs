//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the public share endpoints
//! - Wire up middleware (tracing, request ID, optional dev guard)
//! - Bind the public and admin listeners
//! - Apply hot-reloaded guard settings
//! - Own the background tasks started at startup

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::audit::{AccessLogEntry, AccessLogger};
use crate::config::GateConfig;
use crate::guard::{AccessGuard, AccessOutcome, Denial, DenyReason, Stage};
use crate::http::handlers::{self, request_id};
use crate::http::request::ClientInfo;
use crate::http::response::{fallback, uniform_denial};
use crate::lifecycle::{build_components, Shutdown, StartupError};
use crate::security::counter::MemoryCounterStore;
use crate::security::remote::{RemoteGuard, RemoteVerdict};
use crate::security::token;
use crate::share::MailboxSource;

/// Application state injected into the share handlers.
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<AccessGuard>,
    pub mailboxes: Arc<dyn MailboxSource>,
    pub logger: AccessLogger,
}

/// Build the public share router.
///
/// No response header varies per request, so denials stay byte-identical.
/// The request ID is generated for the access log only and never echoed.
pub fn share_router(state: AppState, remote_guard: Option<Arc<RemoteGuard>>) -> Router {
    let logger = state.logger.clone();
    let mut router = Router::new()
        .route("/share/emails/{token}", get(handlers::get_share_emails))
        .route("/share/{token}", get(handlers::get_share))
        .fallback(fallback)
        .with_state(state);

    if let Some(remote) = remote_guard {
        let dev = DevGuard { remote, logger };
        router = router.layer(middleware::from_fn_with_state(dev, remote_guard_middleware));
    }

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http()),
    )
}

/// State for the development guard layer.
#[derive(Clone)]
struct DevGuard {
    remote: Arc<RemoteGuard>,
    logger: AccessLogger,
}

/// Development guard: the remote deployment must allow the share first.
///
/// Malformed tokens pass straight through to the pipeline, which rejects
/// them at the format check without any outbound call.
async fn remote_guard_middleware(State(dev): State<DevGuard>, request: Request, next: Next) -> Response {
    let token = request.uri().path().rsplit('/').next().unwrap_or_default().to_string();
    if !token::validate(&token) {
        return next.run(request).await;
    }

    let client = ClientInfo::from_headers(request.headers());
    match dev.remote.verify(&token, &client.ip).await {
        RemoteVerdict::Allow => next.run(request).await,
        RemoteVerdict::Deny => {
            let outcome = AccessOutcome::Denied(
                Denial::new(Stage::DevGuard, DenyReason::NotFound).with_fault("remote guard denied"),
            );
            dev.logger.record(
                AccessLogEntry::from_outcome(&outcome, &client).with_request_id(request_id(request.headers())),
            );
            uniform_denial()
        }
    }
}

fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// HTTP server for the share gate.
pub struct HttpServer {
    router: Router,
    admin_router: Option<Router>,
    config: GateConfig,
    guard: Arc<AccessGuard>,
    sweeper: Option<MemoryCounterStore>,
    log_writer: JoinHandle<()>,
}

impl HttpServer {
    /// Build every subsystem. The access log writer starts immediately and
    /// stops when `shutdown` fires.
    pub async fn build(config: GateConfig, shutdown: &Shutdown) -> Result<Self, StartupError> {
        let components = build_components(&config, shutdown).await?;

        let remote_guard = if config.dev_guard.enabled {
            tracing::warn!(endpoint = %config.dev_guard.endpoint, "Dev remote guard enabled");
            Some(Arc::new(RemoteGuard::from_config(&config.dev_guard)?))
        } else {
            None
        };

        let guard = components.state.guard.clone();
        let router = share_router(components.state, remote_guard);
        let admin_router = config
            .admin
            .enabled
            .then(|| setup_admin_router(components.admin));

        Ok(Self {
            router,
            admin_router,
            config,
            guard,
            sweeper: components.sweeper,
            log_writer: components.log_writer,
        })
    }

    /// The public router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, then drain and wait for the access log
    /// writer to flush.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GateConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(sweeper) = self.sweeper {
            let every = Duration::from_secs(self.config.rate_limit.sweep_interval_secs);
            tokio::spawn(sweeper.run_sweeper(every, shutdown.resubscribe()));
        }

        let guard = self.guard.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let settings = config.guard_settings();
                guard.reconfigure(settings);
                tracing::info!(
                    ip_per_second = settings.ip_limits.per_second,
                    ip_per_minute = settings.ip_limits.per_minute,
                    request_timeout_ms = saturating_millis(settings.request_timeout),
                    "Applied reloaded guard settings"
                );
            }
        });

        let admin_task = match self.admin_router {
            Some(admin_router) => {
                let admin_listener = TcpListener::bind(self.config.admin.bind_address.as_str()).await?;
                tracing::info!(address = %self.config.admin.bind_address, "Admin API listening");
                let mut admin_shutdown = shutdown.resubscribe();
                Some(tokio::spawn(async move {
                    let served = axum::serve(admin_listener, admin_router)
                        .with_graceful_shutdown(async move {
                            let _ = admin_shutdown.recv().await;
                        })
                        .await;
                    if let Err(e) = served {
                        tracing::error!(error = %e, "Admin server error");
                    }
                }))
            }
            None => None,
        };

        let mut shutdown = shutdown;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        if let Some(task) = admin_task {
            let _ = task.await;
        }
        if let Err(e) = self.log_writer.await {
            tracing::error!(error = %e, "Access log writer panicked");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
