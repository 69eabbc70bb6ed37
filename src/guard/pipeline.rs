//! The ordered access decision.
//!
//! Checks run cheapest first and stop at the first failure:
//!
//! ```text
//! FORMAT_CHECK → RATE_LIMIT_CHECK (ip, then share) → LOOKUP
//!     → STATUS_CHECK → EXPIRY_CHECK → WHITELIST_CHECK → ALLOWED
//! ```
//!
//! No lookup happens for a malformed token and no record check happens for
//! a rate-limited or unknown one. Every infrastructure failure is a denial.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};

use crate::guard::limits::ShareLimitsCache;
use crate::guard::outcome::{AccessOutcome, Denial, DenyReason, LimitScope, Stage};
use crate::observability::metrics;
use crate::resilience::Deadline;
use crate::security::rate_limit::{RateDecision, RateLimitKey, RateLimiter, RateLimits};
use crate::security::token;
use crate::share::model::{ShareDefaults, ShareRecord};
use crate::share::store::ShareRecordStore;

/// Reloadable guard settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardSettings {
    /// System-wide limits for the IP-keyed check.
    pub ip_limits: RateLimits,
    /// Used for the share-keyed check until the share's own limits are known.
    pub share_defaults: ShareDefaults,
    pub request_timeout: Duration,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            ip_limits: RateLimits::new(10, 120),
            share_defaults: ShareDefaults::default(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// One access attempt.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub token: String,
    pub client_ip: String,
    /// Normalized requester address, if one was supplied.
    pub requester_email: Option<String>,
    pub deadline: Deadline,
}

/// Inputs available to the post-lookup checks.
pub struct RecordContext<'a> {
    pub now: DateTime<Utc>,
    pub requester_email: Option<&'a str>,
}

type RecordCheck = fn(&ShareRecord, &RecordContext<'_>) -> Option<DenyReason>;

/// Post-lookup checks, in order.
pub const RECORD_CHECKS: [(Stage, RecordCheck); 3] = [
    (Stage::StatusCheck, check_status),
    (Stage::ExpiryCheck, check_expiry),
    (Stage::WhitelistCheck, check_whitelist),
];

fn check_status(record: &ShareRecord, _ctx: &RecordContext<'_>) -> Option<DenyReason> {
    record.is_disabled().then_some(DenyReason::Disabled)
}

fn check_expiry(record: &ShareRecord, ctx: &RecordContext<'_>) -> Option<DenyReason> {
    record.is_expired_at(ctx.now).then_some(DenyReason::Expired)
}

fn check_whitelist(record: &ShareRecord, ctx: &RecordContext<'_>) -> Option<DenyReason> {
    (!record.permits(ctx.requester_email)).then_some(DenyReason::UnauthorizedEmail)
}

/// Run the record checks alone. Pure; used by the pipeline and its tests.
pub fn check_record(record: &ShareRecord, ctx: &RecordContext<'_>) -> Result<(), Denial> {
    for (stage, check) in RECORD_CHECKS {
        if let Some(reason) = check(record, ctx) {
            return Err(Denial::new(stage, reason).for_share(&record.token));
        }
    }
    Ok(())
}

/// Orchestrates the decision over the limiter and the record store.
pub struct AccessGuard {
    limiter: RateLimiter,
    store: Arc<dyn ShareRecordStore>,
    limits_cache: ShareLimitsCache,
    settings: ArcSwap<GuardSettings>,
}

impl AccessGuard {
    pub fn new(
        limiter: RateLimiter,
        store: Arc<dyn ShareRecordStore>,
        limits_cache: ShareLimitsCache,
        settings: GuardSettings,
    ) -> Self {
        Self {
            limiter,
            store,
            limits_cache,
            settings: ArcSwap::from_pointee(settings),
        }
    }

    pub fn settings(&self) -> GuardSettings {
        **self.settings.load()
    }

    /// Swap in new settings; later evaluations observe them.
    pub fn reconfigure(&self, settings: GuardSettings) {
        self.settings.store(Arc::new(settings));
    }

    /// Start a deadline for a request arriving now.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.settings.load().request_timeout)
    }

    pub async fn evaluate(&self, req: &AccessRequest) -> AccessOutcome {
        match self.run(req).await {
            Ok(record) => AccessOutcome::Allowed(Box::new(record)),
            Err(denial) => AccessOutcome::Denied(denial),
        }
    }

    async fn run(&self, req: &AccessRequest) -> Result<ShareRecord, Denial> {
        if !token::validate(&req.token) {
            return Err(Denial::new(Stage::FormatCheck, DenyReason::MalformedToken));
        }

        let settings = self.settings();
        self.limit(req, RateLimitKey::Ip(req.client_ip.clone()), settings.ip_limits, LimitScope::Ip)
            .await?;

        let share_limits = self
            .limits_cache
            .get(&req.token)
            .unwrap_or_else(|| settings.share_defaults.rate_limits());
        self.limit(req, RateLimitKey::Share(req.token.clone()), share_limits, LimitScope::Share)
            .await?;

        let record = self.lookup(req).await?;
        self.limits_cache.remember(&record);

        let ctx = RecordContext {
            now: Utc::now(),
            requester_email: req.requester_email.as_deref(),
        };
        check_record(&record, &ctx)?;
        Ok(record)
    }

    async fn limit(
        &self,
        req: &AccessRequest,
        key: RateLimitKey,
        limits: RateLimits,
        scope: LimitScope,
    ) -> Result<(), Denial> {
        let denied = |retry_after_secs| {
            Denial::new(Stage::RateLimitCheck, DenyReason::RateLimited { scope, retry_after_secs })
        };

        match req.deadline.run(self.limiter.check_and_increment(&key, limits)).await {
            Ok(Ok(RateDecision::Allowed)) => Ok(()),
            Ok(Ok(RateDecision::Denied { retry_after_secs })) => Err(denied(retry_after_secs)),
            Ok(Err(e)) => {
                tracing::error!(key = %key, error = %e, "Counter store failed, denying");
                metrics::record_store_failure("counter");
                Err(denied(0).with_fault(e))
            }
            Err(e) => {
                tracing::warn!(key = %key, "Counter increment missed the request deadline, denying");
                metrics::record_store_failure("counter");
                Err(denied(0).with_fault(e))
            }
        }
    }

    async fn lookup(&self, req: &AccessRequest) -> Result<ShareRecord, Denial> {
        let not_found = || Denial::new(Stage::Lookup, DenyReason::NotFound);

        match req.deadline.run(self.store.get(&req.token)).await {
            Ok(Ok(Some(record))) => Ok(record),
            Ok(Ok(None)) => Err(not_found()),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Share lookup failed, denying");
                metrics::record_store_failure("lookup");
                Err(not_found().with_fault(e))
            }
            Err(e) => {
                tracing::warn!("Share lookup missed the request deadline, denying");
                metrics::record_store_failure("lookup");
                Err(not_found().with_fault(e))
            }
        }
    }
}
