//! Audit logging of share access.
//!
//! # Data Flow
//! ```text
//! AccessOutcome (full detail)
//!     → entry.rs (AccessLogEntry with IP, user agent, stage, fault)
//!     → logger.rs (unbounded channel, never fails the caller)
//!     → writer task → sinks.rs (tracing, JSON lines, in-memory ring)
//! ```

pub mod entry;
pub mod logger;
pub mod sinks;

pub use entry::AccessLogEntry;
pub use logger::AccessLogger;
pub use sinks::{AccessLogSink, JsonLinesSink, MemorySink, TracingSink};
