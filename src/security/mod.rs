//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Share request:
//!     → token.rs (shape check, no I/O)
//!     → rate_limit.rs (IP window pair, then token window pair)
//!         → counter.rs (atomic increment-with-TTL; memory or redis)
//!     → guard pipeline continues with the record lookup
//!
//! Development deployments only:
//!     → remote.rs (delegate the verdict to a remote endpoint)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a counter or remote failure denies
//! - Each key owns its windows; no key can exhaust another's budget

pub mod counter;
pub mod rate_limit;
#[cfg(feature = "redis-backend")]
pub mod redis_counter;
pub mod remote;
pub mod token;

pub use counter::{CounterError, CounterStore, MemoryCounterStore};
pub use rate_limit::{RateDecision, RateLimitKey, RateLimiter, RateLimits};
