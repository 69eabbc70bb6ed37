//! Shutdown coordination for the gate.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// The HTTP listeners, the counter sweeper and the access log writer all
/// subscribe to the same broadcast. Dropping the coordinator also releases
/// every subscriber, so keep it alive for as long as the server runs.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Broadcast the shutdown signal. Returns how many tasks were notified.
    pub fn trigger(&self) -> usize {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(tasks = notified, "Shutdown signal broadcast");
        notified
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        assert_eq!(shutdown.trigger(), 2);
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn trigger_without_subscribers_is_harmless() {
        assert_eq!(Shutdown::default().trigger(), 0);
    }
}
