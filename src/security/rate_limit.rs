//! Two-window rate limiting.
//!
//! Every key carries a 1-second and a 60-second window. Both are
//! incremented on each check; exceeding either one denies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::security::counter::{CounterError, CounterStore, WindowCount};

pub const SECOND_WINDOW: Duration = Duration::from_secs(1);
pub const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Per-second and per-minute thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimits {
    pub per_second: u32,
    pub per_minute: u32,
}

impl RateLimits {
    pub const fn new(per_second: u32, per_minute: u32) -> Self {
        Self { per_second, per_minute }
    }

    /// The minute budget must cover at least one full second of traffic.
    pub fn is_consistent(&self) -> bool {
        self.per_minute >= self.per_second
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new(5, 60)
    }
}

/// Identity a counter pair belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    Ip(String),
    Share(String),
}

impl RateLimitKey {
    fn storage_key(&self, window: Duration) -> String {
        format!("ratelimit:{}:{}s", self, window.as_secs())
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitKey::Ip(ip) => write!(f, "ip:{}", ip),
            RateLimitKey::Share(token) => write!(f, "share:{}", token),
        }
    }
}

/// Result of one limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }

    pub fn retry_after_secs(&self) -> u64 {
        match self {
            RateDecision::Allowed => 0,
            RateDecision::Denied { retry_after_secs } => *retry_after_secs,
        }
    }
}

/// Rate limiter over an abstract counter store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    /// Increment both windows for `key` and decide against `limits`.
    ///
    /// Store failures are returned to the caller, which must deny.
    pub async fn check_and_increment(
        &self,
        key: &RateLimitKey,
        limits: RateLimits,
    ) -> Result<RateDecision, CounterError> {
        let second_key = key.storage_key(SECOND_WINDOW);
        let minute_key = key.storage_key(MINUTE_WINDOW);
        let (second, minute) = tokio::try_join!(
            self.store.increment(&second_key, SECOND_WINDOW),
            self.store.increment(&minute_key, MINUTE_WINDOW),
        )?;

        let decision = decide(second, minute, limits);
        if !decision.is_allowed() {
            tracing::debug!(
                key = %key,
                second_count = second.count,
                minute_count = minute.count,
                retry_after = decision.retry_after_secs(),
                "Rate limit exceeded"
            );
        }
        Ok(decision)
    }
}

fn decide(second: WindowCount, minute: WindowCount, limits: RateLimits) -> RateDecision {
    let over_second = second.count > u64::from(limits.per_second);
    let over_minute = minute.count > u64::from(limits.per_minute);

    let wait = match (over_second, over_minute) {
        (false, false) => return RateDecision::Allowed,
        (true, false) => second.remaining,
        (false, true) => minute.remaining,
        (true, true) => second.remaining.max(minute.remaining),
    };
    RateDecision::Denied {
        retry_after_secs: ceil_secs(wait),
    }
}

/// Whole seconds to wait, never less than one.
fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}
