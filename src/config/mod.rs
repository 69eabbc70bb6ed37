//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the new guard settings in atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Only guard settings (IP limits, share defaults, deadline) hot-reload;
//!   listeners, stores and sinks need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AccessLogConfig, AdminConfig, CounterBackend, DevGuardConfig, GateConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, RateLimitConfig, StorageConfig,
};
