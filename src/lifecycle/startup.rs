//! Startup orchestration.
//!
//! Builds every subsystem in dependency order: counter store, rate limiter,
//! share and mailbox stores, access log sinks and writer, then the
//! per-share limits of every stored record. Any failure is fatal.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::admin::AdminState;
use crate::audit::{AccessLogSink, AccessLogger, JsonLinesSink, MemorySink, TracingSink};
use crate::audit::sinks::SinkError;
use crate::config::{CounterBackend, GateConfig, RateLimitConfig};
use crate::guard::{AccessGuard, ShareLimitsCache};
use crate::http::server::AppState;
use crate::lifecycle::Shutdown;
use crate::security::counter::{CounterError, CounterStore, MemoryCounterStore};
use crate::security::remote::RemoteGuardError;
use crate::security::RateLimiter;
use crate::share::{MailboxSource, MemoryMailbox, MemoryShareStore, ShareRecordStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open share store: {0}")]
    Store(#[from] StoreError),
    #[error("failed to open counter store: {0}")]
    Counter(#[from] CounterError),
    #[error("failed to open access log sink: {0}")]
    Sink(#[from] SinkError),
    #[error("failed to configure dev guard: {0}")]
    RemoteGuard(#[from] RemoteGuardError),
    #[error("counter backend \"redis\" requires the redis-backend feature")]
    RedisUnsupported,
}

/// Everything the listeners need, wired together.
pub struct Components {
    pub state: AppState,
    pub admin: AdminState,
    /// Present when counters live in process memory and need sweeping.
    pub sweeper: Option<MemoryCounterStore>,
    pub log_writer: JoinHandle<()>,
}

pub async fn build_components(config: &GateConfig, shutdown: &Shutdown) -> Result<Components, StartupError> {
    let (counters, sweeper) = counter_store(&config.rate_limit).await?;

    let shares: Arc<dyn ShareRecordStore> = match &config.storage.shares_path {
        Some(path) => Arc::new(MemoryShareStore::load_from_file(path)?),
        None => Arc::new(MemoryShareStore::new(None)),
    };
    let mailboxes: Arc<dyn MailboxSource> = match &config.storage.mailboxes_path {
        Some(path) => Arc::new(MemoryMailbox::load_from_file(path)?),
        None => Arc::new(MemoryMailbox::new()),
    };

    let memory_log = MemorySink::new(config.access_log.memory_capacity);
    let mut sinks: Vec<Arc<dyn AccessLogSink>> = vec![Arc::new(TracingSink), Arc::new(memory_log.clone())];
    if let Some(path) = &config.access_log.jsonl_path {
        sinks.push(Arc::new(JsonLinesSink::open(path)?));
        tracing::info!(path = %path.display(), "Access log file sink enabled");
    }
    let (logger, log_writer) = AccessLogger::spawn(sinks, shutdown.subscribe());

    let limits_cache = ShareLimitsCache::new();
    for record in shares.all().await? {
        limits_cache.remember(&record);
    }
    if !limits_cache.is_empty() {
        tracing::info!(count = limits_cache.len(), "Primed per-share limits");
    }
    let guard = Arc::new(AccessGuard::new(
        RateLimiter::new(counters.clone()),
        shares.clone(),
        limits_cache.clone(),
        config.guard_settings(),
    ));

    let admin = AdminState {
        shares,
        limits_cache,
        counters,
        access_log: memory_log,
        share_defaults: config.share_defaults,
        api_key: Arc::from(config.admin.api_key.as_str()),
    };

    Ok(Components {
        state: AppState {
            guard,
            mailboxes,
            logger,
        },
        admin,
        sweeper,
        log_writer,
    })
}

async fn counter_store(
    config: &RateLimitConfig,
) -> Result<(Arc<dyn CounterStore>, Option<MemoryCounterStore>), StartupError> {
    match config.backend {
        CounterBackend::Memory => {
            let store = MemoryCounterStore::new();
            Ok((Arc::new(store.clone()), Some(store)))
        }
        #[cfg(feature = "redis-backend")]
        CounterBackend::Redis => {
            let store = crate::security::redis_counter::RedisCounterStore::connect(
                &config.redis_url,
                &config.key_prefix,
            )
            .await?;
            Ok((Arc::new(store), None))
        }
        #[cfg(not(feature = "redis-backend"))]
        CounterBackend::Redis => Err(StartupError::RedisUnsupported),
    }
}
