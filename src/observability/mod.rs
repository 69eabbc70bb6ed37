//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Guard, stores and handlers emit:
//!     → logging.rs (operational events; access entries on the `access_log` target)
//!     → metrics.rs (outcome counters, store failures, latency)
//!
//! Consumers:
//!     → stdout, pretty for development or JSON lines for shipping
//!     → Prometheus scrape on a separate listener
//! ```
//!
//! # Design Decisions
//! - The request ID from the request-id layer lands in every access entry
//! - No metric label carries a token, IP or email

pub mod logging;
pub mod metrics;
