//! Share record model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::security::rate_limit::RateLimits;
use crate::security::token::TOKEN_LEN;

/// Owner-controlled share status. Expiry is derived, never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    #[default]
    Active,
    Disabled,
}

/// Persisted metadata for one share link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    pub token: String,
    /// Address of the mailbox this share exposes.
    pub mailbox: String,
    pub created_at: DateTime<Utc>,
    /// `None` means the share never expires.
    #[serde(rename = "expireTime")]
    pub expire_at: Option<DateTime<Utc>>,
    pub status: ShareStatus,
    /// Lowercased requester addresses. Empty means unrestricted.
    #[serde(default)]
    pub whitelist: BTreeSet<String>,
    #[serde(default)]
    pub keyword_filter: Option<String>,
    pub rate_limit_per_second: u32,
    pub rate_limit_per_minute: u32,
    pub otp_limit_daily: u32,
    pub verification_code_limit: u32,
}

impl ShareRecord {
    pub fn is_disabled(&self) -> bool {
        self.status == ShareStatus::Disabled
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.is_some_and(|at| at <= now)
    }

    /// Whether `email` may use this share. An empty whitelist admits anyone.
    pub fn permits(&self, email: Option<&str>) -> bool {
        if self.whitelist.is_empty() {
            return true;
        }
        email.is_some_and(|e| self.whitelist.contains(&normalize_email(e)))
    }

    pub fn rate_limits(&self) -> RateLimits {
        RateLimits::new(self.rate_limit_per_second, self.rate_limit_per_minute)
    }
}

/// Fields an owner supplies when creating a share.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShare {
    pub mailbox: String,
    #[serde(default, rename = "expireTime")]
    pub expire_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub keyword_filter: Option<String>,
    #[serde(default)]
    pub rate_limit_per_second: Option<u32>,
    #[serde(default)]
    pub rate_limit_per_minute: Option<u32>,
    #[serde(default)]
    pub otp_limit_daily: Option<u32>,
    #[serde(default)]
    pub verification_code_limit: Option<u32>,
}

/// Defaults applied to fields a [`NewShare`] leaves unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareDefaults {
    pub rate_limit_per_second: u32,
    pub rate_limit_per_minute: u32,
    pub otp_limit_daily: u32,
    pub verification_code_limit: u32,
}

impl Default for ShareDefaults {
    fn default() -> Self {
        Self {
            rate_limit_per_second: 5,
            rate_limit_per_minute: 60,
            otp_limit_daily: 10,
            verification_code_limit: 5,
        }
    }
}

impl ShareDefaults {
    pub fn rate_limits(&self) -> RateLimits {
        RateLimits::new(self.rate_limit_per_second, self.rate_limit_per_minute)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareValidationError {
    #[error("mailbox must not be empty")]
    EmptyMailbox,
    #[error("rateLimitPerMinute ({per_minute}) must be >= rateLimitPerSecond ({per_second})")]
    InconsistentLimits { per_second: u32, per_minute: u32 },
    #[error("invalid whitelist address: {0}")]
    InvalidWhitelistEntry(String),
}

impl NewShare {
    /// Validate and turn the request into a record with a fresh token.
    pub fn into_record(
        self,
        defaults: &ShareDefaults,
        now: DateTime<Utc>,
    ) -> Result<ShareRecord, ShareValidationError> {
        let mailbox = self.mailbox.trim().to_string();
        if mailbox.is_empty() {
            return Err(ShareValidationError::EmptyMailbox);
        }

        let limits = RateLimits::new(
            self.rate_limit_per_second.unwrap_or(defaults.rate_limit_per_second),
            self.rate_limit_per_minute.unwrap_or(defaults.rate_limit_per_minute),
        );
        check_limits(limits)?;

        let mut whitelist = BTreeSet::new();
        for raw in self.whitelist {
            let email = normalize_email(&raw);
            if !looks_like_email(&email) {
                return Err(ShareValidationError::InvalidWhitelistEntry(raw));
            }
            whitelist.insert(email);
        }

        let keyword_filter = self
            .keyword_filter
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Ok(ShareRecord {
            token: generate_token(),
            mailbox,
            created_at: now,
            expire_at: self.expire_at,
            status: ShareStatus::Active,
            whitelist,
            keyword_filter,
            rate_limit_per_second: limits.per_second,
            rate_limit_per_minute: limits.per_minute,
            otp_limit_daily: self.otp_limit_daily.unwrap_or(defaults.otp_limit_daily),
            verification_code_limit: self
                .verification_code_limit
                .unwrap_or(defaults.verification_code_limit),
        })
    }
}

pub fn check_limits(limits: RateLimits) -> Result<(), ShareValidationError> {
    if limits.is_consistent() {
        Ok(())
    } else {
        Err(ShareValidationError::InconsistentLimits {
            per_second: limits.per_second,
            per_minute: limits.per_minute,
        })
    }
}

/// Fresh 32-character alphanumeric share token.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}
