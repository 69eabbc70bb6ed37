//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML and every
//! field has a default, so an empty file is a valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::guard::GuardSettings;
use crate::security::rate_limit::RateLimits;
use crate::share::model::ShareDefaults;

pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the share gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    /// Public listener for the share routes.
    pub listener: ListenerConfig,

    /// Deadline applied to every external call a request makes.
    pub timeouts: TimeoutConfig,

    /// IP-keyed limits and the counter store backend.
    pub rate_limit: RateLimitConfig,

    /// Defaults for newly created shares and for shares whose limits are
    /// not yet known to the guard.
    pub share_defaults: ShareDefaults,

    /// Optional JSON files backing the in-memory stores.
    pub storage: StorageConfig,

    /// Audit log destinations.
    pub access_log: AccessLogConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Owner management API.
    pub admin: AdminConfig,

    /// Development-only remote validation.
    pub dev_guard: DevGuardConfig,
}

impl GateConfig {
    pub fn guard_settings(&self) -> GuardSettings {
        GuardSettings {
            ip_limits: self.rate_limit.ip_limits(),
            share_defaults: self.share_defaults,
            request_timeout: Duration::from_secs(self.timeouts.request_secs),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total budget for the external calls of one request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 10 }
    }
}

/// Which counter store backs the rate limiter.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    #[default]
    Memory,
    Redis,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per second per IP.
    pub ip_per_second: u32,

    /// Maximum requests per minute per IP.
    pub ip_per_minute: u32,

    /// How often lapsed in-memory windows are purged.
    pub sweep_interval_secs: u64,

    pub backend: CounterBackend,

    /// Redis connection URL, required when `backend = "redis"`.
    pub redis_url: String,

    pub key_prefix: String,
}

impl RateLimitConfig {
    pub fn ip_limits(&self) -> RateLimits {
        RateLimits::new(self.ip_per_second, self.ip_per_minute)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip_per_second: 10,
            ip_per_minute: 120,
            sweep_interval_secs: 30,
            backend: CounterBackend::Memory,
            redis_url: String::new(),
            key_prefix: "mailshare:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Share records, loaded at startup and rewritten on owner changes.
    pub shares_path: Option<PathBuf>,

    /// Mailbox fixtures: `{ "address": [email, ...] }`.
    pub mailboxes_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Append entries as JSON lines to this file.
    pub jsonl_path: Option<PathBuf>,

    /// Entries kept in memory for the admin API.
    pub memory_capacity: usize,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            jsonl_path: None,
            memory_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Development remote guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DevGuardConfig {
    /// Front the share routes with the remote guard.
    pub enabled: bool,

    /// Base URL of the deployment that owns the verdict.
    pub endpoint: String,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DevGuardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://127.0.0.1:8787".to_string(),
            timeout_ms: 2000,
        }
    }
}
