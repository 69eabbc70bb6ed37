//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives:
//!     → timeouts.rs (fix the request deadline)
//!     → counter increment, record lookup, mailbox fetch each run under it
//!     → an elapsed deadline is a failure and the request is denied
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: a failed external call denies instead

pub mod timeouts;

pub use timeouts::{Deadline, DeadlineExceeded};
