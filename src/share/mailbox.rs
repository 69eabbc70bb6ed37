//! Mailbox content source.
//!
//! Mail storage lives elsewhere; the gate only needs to list a mailbox's
//! messages once access has been allowed.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::share::store::StoreError;

/// One message as exposed through a share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: String,
    pub from: String,
    pub subject: String,
    #[serde(default)]
    pub text: String,
    pub received_at: DateTime<Utc>,
}

#[async_trait]
pub trait MailboxSource: Send + Sync {
    /// All messages in `mailbox`. Unknown mailboxes are empty.
    async fn list(&self, mailbox: &str) -> Result<Vec<Email>, StoreError>;
}

/// In-memory mailbox source keyed by lowercased address.
#[derive(Clone, Default)]
pub struct MemoryMailbox {
    inner: Arc<DashMap<String, Vec<Email>>>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `{ "address": [email, ...] }` document.
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let mailbox = Self::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let boxes: HashMap<String, Vec<Email>> = serde_json::from_reader(reader)?;
            for (address, emails) in boxes {
                mailbox.insert(&address, emails);
            }
            tracing::info!(mailboxes = mailbox.inner.len(), "Loaded mailbox fixtures");
        }
        Ok(mailbox)
    }

    pub fn insert(&self, address: &str, emails: Vec<Email>) {
        self.inner
            .entry(address.trim().to_ascii_lowercase())
            .or_default()
            .extend(emails);
    }
}

#[async_trait]
impl MailboxSource for MemoryMailbox {
    async fn list(&self, mailbox: &str) -> Result<Vec<Email>, StoreError> {
        let key = mailbox.trim().to_ascii_lowercase();
        Ok(self.inner.get(&key).map(|r| r.value().clone()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn email(id: &str) -> Email {
        Email {
            id: id.into(),
            from: "sender@example.com".into(),
            subject: "hello".into(),
            text: String::new(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let mb = MemoryMailbox::new();
        mb.insert("Owner@Example.com", vec![email("1"), email("2")]);
        assert_eq!(mb.list("owner@example.com").await.unwrap().len(), 2);
        assert!(mb.list("other@example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"box@example.com": [{{"id": "m1", "from": "a@b.c", "subject": "s", "receivedAt": "2024-01-01T00:00:00Z"}}]}}"#
        )
        .unwrap();

        let mb = MemoryMailbox::load_from_file(file.path()).unwrap();
        let emails = mb.list("box@example.com").await.unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].id, "m1");
        assert!(emails[0].text.is_empty());
    }
}
