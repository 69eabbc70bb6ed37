//! Windowed counter storage.
//!
//! The rate limiter only needs one primitive from its backing store: an
//! atomic increment that starts a fresh window (with TTL) when the previous
//! one has lapsed. Anything offering that primitive can sit behind
//! [`CounterStore`]; the in-memory store below serves tests and single-node
//! deployments.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Snapshot of a window right after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Post-increment count for the current window.
    pub count: u64,
    /// Time left until the window resets.
    pub remaining: Duration,
}

/// Counter store failure. Callers must treat it as a denial.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("counter backend unavailable: {0}")]
    Unavailable(String),
    #[error("counter backend returned malformed data: {0}")]
    Protocol(String),
}

/// Atomic increment-with-TTL service.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key`, opening a new window of length `window` if none is live.
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CounterError>;

    /// Number of live keys, if the backend can report it cheaply.
    fn tracked_keys(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug)]
struct Window {
    count: u64,
    resets_at: Instant,
}

/// Process-local counter store backed by a `DashMap`.
///
/// The entry guard holds the shard lock for the whole read-increment-write,
/// so concurrent increments on one key never lose updates.
#[derive(Debug, Clone, Default)]
pub struct MemoryCounterStore {
    windows: Arc<DashMap<String, Window>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every window that has already reset. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, w| w.resets_at > now);
        before.saturating_sub(self.windows.len())
    }

    /// Periodically purge lapsed windows until shutdown.
    pub async fn run_sweeper(self, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, live = self.windows.len(), "Purged expired rate-limit windows");
                    }
                    crate::observability::metrics::record_rate_limit_keys(self.windows.len());
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Counter sweeper stopping");
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CounterError> {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            resets_at: now + window,
        });

        if entry.resets_at <= now {
            entry.count = 0;
            entry.resets_at = now + window;
        }
        entry.count += 1;

        Ok(WindowCount {
            count: entry.count,
            remaining: entry.resets_at.saturating_duration_since(now),
        })
    }

    fn tracked_keys(&self) -> Option<usize> {
        Some(self.windows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_increment_counts_within_window() {
        let store = MemoryCounterStore::new();
        let w = Duration::from_secs(1);

        assert_eq!(store.increment("k", w).await.unwrap().count, 1);
        assert_eq!(store.increment("k", w).await.unwrap().count, 2);

        tokio::time::advance(Duration::from_millis(400)).await;
        let snap = store.increment("k", w).await.unwrap();
        assert_eq!(snap.count, 3);
        assert_eq!(snap.remaining, Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_ttl() {
        let store = MemoryCounterStore::new();
        let w = Duration::from_secs(1);

        store.increment("k", w).await.unwrap();
        store.increment("k", w).await.unwrap();
        tokio::time::advance(Duration::from_millis(1001)).await;

        let snap = store.increment("k", w).await.unwrap();
        assert_eq!(snap.count, 1);
        assert_eq!(snap.remaining, w);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_drops_only_lapsed_windows() {
        let store = MemoryCounterStore::new();
        store.increment("short", Duration::from_secs(1)).await.unwrap();
        store.increment("long", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.tracked_keys(), Some(1));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = MemoryCounterStore::new();
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let s = store.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..10 {
                    s.increment("hot", Duration::from_secs(60)).await.unwrap();
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        let snap = store.increment("hot", Duration::from_secs(60)).await.unwrap();
        assert_eq!(snap.count, 321);
    }
}
