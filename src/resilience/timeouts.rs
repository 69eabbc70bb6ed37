//! Request deadlines.
//!
//! A [`Deadline`] is fixed once when a request arrives; every external call
//! made on that request's behalf runs under it and is never retried past it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request deadline exceeded")]
pub struct DeadlineExceeded;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self { at: Instant::now() + budget }
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Run `fut` unless the deadline passes first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, DeadlineExceeded>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout_at(self.at, fut).await.map_err(|_| DeadlineExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_completes_within_deadline() {
        let d = Deadline::after(Duration::from_secs(1));
        assert_eq!(d.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_is_cut_off() {
        let d = Deadline::after(Duration::from_millis(100));
        let res = d
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(res, Err(DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_shared_across_calls() {
        let d = Deadline::after(Duration::from_millis(150));
        d.run(tokio::time::sleep(Duration::from_millis(100))).await.unwrap();
        assert_eq!(d.remaining(), Duration::from_millis(50));
        assert!(d.run(tokio::time::sleep(Duration::from_millis(100))).await.is_err());
    }
}
