//! Fire-and-forget audit logging.
//!
//! The handler hands each entry to [`AccessLogger::record`], which never
//! blocks and never fails. A writer task drains the channel into every
//! configured sink; sink errors are counted and dropped.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::audit::entry::AccessLogEntry;
use crate::audit::sinks::AccessLogSink;
use crate::observability::metrics;

#[derive(Clone)]
pub struct AccessLogger {
    tx: mpsc::UnboundedSender<AccessLogEntry>,
}

impl AccessLogger {
    /// A logger plus the receiving end for a writer.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AccessLogEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A logger with a writer task already running over `sinks`.
    pub fn spawn(sinks: Vec<Arc<dyn AccessLogSink>>, shutdown: broadcast::Receiver<()>) -> (Self, JoinHandle<()>) {
        let (logger, rx) = Self::channel();
        let handle = tokio::spawn(run_writer(rx, sinks, shutdown));
        (logger, handle)
    }

    pub fn record(&self, entry: AccessLogEntry) {
        metrics::record_access(entry.outcome);
        if self.tx.send(entry).is_err() {
            metrics::record_access_log_dropped();
            tracing::debug!("Access log writer gone, entry dropped");
        }
    }
}

fn write_all(sinks: &[Arc<dyn AccessLogSink>], entry: &AccessLogEntry) {
    for sink in sinks {
        if let Err(e) = sink.write(entry) {
            metrics::record_access_log_dropped();
            tracing::warn!(sink = sink.name(), error = %e, "Access log write failed");
        }
    }
}

/// Drain entries into `sinks` until shutdown, then flush what is queued.
pub async fn run_writer(
    mut rx: mpsc::UnboundedReceiver<AccessLogEntry>,
    sinks: Vec<Arc<dyn AccessLogSink>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            entry = rx.recv() => match entry {
                Some(entry) => write_all(&sinks, &entry),
                None => return,
            },
            _ = shutdown.recv() => {
                rx.close();
                while let Some(entry) = rx.recv().await {
                    write_all(&sinks, &entry);
                }
                tracing::debug!("Access log writer stopped");
                return;
            }
        }
    }
}
