//! Access decision subsystem.
//!
//! `pipeline.rs` produces one detailed [`AccessOutcome`] per request. The
//! HTTP layer projects it twice: a collapsed response for the client and a
//! full entry for the audit log.

pub mod limits;
pub mod outcome;
pub mod pipeline;

pub use limits::ShareLimitsCache;
pub use outcome::{AccessOutcome, Denial, DenyReason, LimitScope, OutcomeCode, Stage};
pub use pipeline::{AccessGuard, AccessRequest, GuardSettings};
