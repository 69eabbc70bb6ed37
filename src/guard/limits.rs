//! Per-share limits known before the record lookup.
//!
//! The token-keyed rate-limit check runs ahead of the lookup, so the
//! share's own thresholds come from this cache. It is primed from the
//! store at startup, filled when a share is created or looked up, and
//! refreshed whenever an owner updates the share.

use std::sync::Arc;

use dashmap::DashMap;

use crate::security::rate_limit::RateLimits;
use crate::share::model::ShareRecord;

#[derive(Debug, Clone, Default)]
pub struct ShareLimitsCache {
    inner: Arc<DashMap<String, RateLimits>>,
}

impl ShareLimitsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token: &str) -> Option<RateLimits> {
        self.inner.get(token).map(|r| *r.value())
    }

    pub fn remember(&self, record: &ShareRecord) {
        self.inner.insert(record.token.clone(), record.rate_limits());
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::{NewShare, ShareDefaults};
    use chrono::Utc;

    #[test]
    fn test_remember_overwrites_previous_limits() {
        let cache = ShareLimitsCache::new();
        let mut record = NewShare { mailbox: "m@example.com".into(), ..Default::default() }
            .into_record(&ShareDefaults::default(), Utc::now())
            .unwrap();
        assert!(cache.get(&record.token).is_none());

        cache.remember(&record);
        assert_eq!(cache.get(&record.token), Some(RateLimits::new(5, 60)));

        record.rate_limit_per_second = 1;
        record.rate_limit_per_minute = 10;
        cache.remember(&record);
        assert_eq!(cache.get(&record.token), Some(RateLimits::new(1, 10)));
        assert_eq!(cache.len(), 1);
    }
}
