//! Share record storage.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::security::rate_limit::RateLimits;
use crate::share::model::{ShareRecord, ShareStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data error: {0}")]
    Data(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read/write contract for share metadata.
///
/// The access pipeline only ever calls [`ShareRecordStore::get`]; the
/// mutating methods exist for owner management.
#[async_trait]
pub trait ShareRecordStore: Send + Sync {
    /// Exact-match lookup by token.
    async fn get(&self, token: &str) -> Result<Option<ShareRecord>, StoreError>;

    async fn put(&self, record: ShareRecord) -> Result<(), StoreError>;

    /// Returns the updated record, or `None` if the token is unknown.
    async fn set_status(&self, token: &str, status: ShareStatus) -> Result<Option<ShareRecord>, StoreError>;

    /// Returns the updated record, or `None` if the token is unknown.
    async fn update_limits(&self, token: &str, limits: RateLimits) -> Result<Option<ShareRecord>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Every stored record. Used at startup to seed per-share limits.
    async fn all(&self) -> Result<Vec<ShareRecord>, StoreError>;
}

/// In-memory share store with optional JSON file persistence.
#[derive(Clone, Default)]
pub struct MemoryShareStore {
    inner: Arc<DashMap<String, ShareRecord>>,
    persistence_path: Option<PathBuf>,
}

impl MemoryShareStore {
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Load from `path` if it exists; later writes are saved back to it.
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let records: Vec<ShareRecord> = serde_json::from_reader(reader)?;
            for record in records {
                store.inner.insert(record.token.clone(), record);
            }
            tracing::info!(count = store.inner.len(), path = %path.display(), "Loaded share records");
        }
        Ok(store)
    }

    pub fn save_to_file(&self) -> Result<(), StoreError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let mut records: Vec<ShareRecord> = self.inner.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &records)?;
        tracing::debug!(count = records.len(), "Saved share records");
        Ok(())
    }

    fn modify<F>(&self, token: &str, f: F) -> Result<Option<ShareRecord>, StoreError>
    where
        F: FnOnce(&mut ShareRecord),
    {
        let updated = self.inner.get_mut(token).map(|mut r| {
            f(r.value_mut());
            r.value().clone()
        });
        if updated.is_some() {
            self.save_to_file()?;
        }
        Ok(updated)
    }
}

#[async_trait]
impl ShareRecordStore for MemoryShareStore {
    async fn get(&self, token: &str) -> Result<Option<ShareRecord>, StoreError> {
        Ok(self.inner.get(token).map(|r| r.value().clone()))
    }

    async fn put(&self, record: ShareRecord) -> Result<(), StoreError> {
        self.inner.insert(record.token.clone(), record);
        self.save_to_file()
    }

    async fn set_status(&self, token: &str, status: ShareStatus) -> Result<Option<ShareRecord>, StoreError> {
        self.modify(token, |r| r.status = status)
    }

    async fn update_limits(&self, token: &str, limits: RateLimits) -> Result<Option<ShareRecord>, StoreError> {
        self.modify(token, |r| {
            r.rate_limit_per_second = limits.per_second;
            r.rate_limit_per_minute = limits.per_minute;
        })
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.len())
    }

    async fn all(&self) -> Result<Vec<ShareRecord>, StoreError> {
        Ok(self.inner.iter().map(|r| r.value().clone()).collect())
    }
}
