//! Audit log destinations.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::audit::entry::AccessLogEntry;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sink lock poisoned")]
    Poisoned,
}

/// Somewhere audit entries go. Writes are best effort.
pub trait AccessLogSink: Send + Sync {
    fn name(&self) -> &'static str;
    fn write(&self, entry: &AccessLogEntry) -> Result<(), SinkError>;
}

/// Emits each entry as a structured event on the `access_log` target.
#[derive(Debug, Default)]
pub struct TracingSink;

impl AccessLogSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn write(&self, entry: &AccessLogEntry) -> Result<(), SinkError> {
        tracing::info!(
            target: "access_log",
            outcome = %entry.outcome,
            share = entry.share_id.as_deref().unwrap_or("-"),
            ip = %entry.ip,
            browser = ?entry.user_agent.browser,
            os = ?entry.user_agent.os,
            device = ?entry.user_agent.device,
            stage = ?entry.stage,
            fault = entry.fault.as_deref().unwrap_or("-"),
            request_id = entry.request_id.as_deref().unwrap_or("-"),
            "share access"
        );
        Ok(())
    }
}

/// Appends entries as JSON lines.
pub struct JsonLinesSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl AccessLogSink for JsonLinesSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn write(&self, entry: &AccessLogEntry) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        serde_json::to_writer(&mut *writer, entry)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps the most recent entries in memory for the admin API.
#[derive(Clone)]
pub struct MemorySink {
    entries: Arc<Mutex<VecDeque<AccessLogEntry>>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AccessLogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.iter().rev().take(limit).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AccessLogSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write(&self, entry: &AccessLogEntry) -> Result<(), SinkError> {
        let mut entries = self.entries.lock().map_err(|_| SinkError::Poisoned)?;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        Ok(())
    }
}
