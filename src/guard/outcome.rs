//! Tagged outcomes of the access decision.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::share::model::ShareRecord;

/// Pipeline stages, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    FormatCheck,
    /// Development-only verdict from a remote deployment.
    DevGuard,
    RateLimitCheck,
    Lookup,
    StatusCheck,
    ExpiryCheck,
    WhitelistCheck,
    /// Fetching content for an already allowed share.
    ContentFetch,
}

/// Externally meaningful outcome code, one per terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeCode {
    Allowed,
    RateLimited,
    MalformedToken,
    NotFound,
    Disabled,
    Expired,
    UnauthorizedEmail,
}

impl OutcomeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeCode::Allowed => "allowed",
            OutcomeCode::RateLimited => "rateLimited",
            OutcomeCode::MalformedToken => "malformedToken",
            OutcomeCode::NotFound => "notFound",
            OutcomeCode::Disabled => "disabled",
            OutcomeCode::Expired => "expired",
            OutcomeCode::UnauthorizedEmail => "unauthorizedEmail",
        }
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which limiter tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitScope {
    Ip,
    Share,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    MalformedToken,
    RateLimited { scope: LimitScope, retry_after_secs: u64 },
    NotFound,
    Disabled,
    Expired,
    UnauthorizedEmail,
}

impl DenyReason {
    pub fn code(&self) -> OutcomeCode {
        match self {
            DenyReason::MalformedToken => OutcomeCode::MalformedToken,
            DenyReason::RateLimited { .. } => OutcomeCode::RateLimited,
            DenyReason::NotFound => OutcomeCode::NotFound,
            DenyReason::Disabled => OutcomeCode::Disabled,
            DenyReason::Expired => OutcomeCode::Expired,
            DenyReason::UnauthorizedEmail => OutcomeCode::UnauthorizedEmail,
        }
    }
}

/// A denial with everything the audit log needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub reason: DenyReason,
    pub stage: Stage,
    /// Token of the resolved record, when the lookup succeeded.
    pub share: Option<String>,
    /// Infrastructure failure that forced this denial.
    pub fault: Option<String>,
}

impl Denial {
    pub fn new(stage: Stage, reason: DenyReason) -> Self {
        Self {
            reason,
            stage,
            share: None,
            fault: None,
        }
    }

    pub fn for_share(mut self, token: &str) -> Self {
        self.share = Some(token.to_string());
        self
    }

    pub fn with_fault(mut self, fault: impl fmt::Display) -> Self {
        self.fault = Some(fault.to_string());
        self
    }
}

/// Result of evaluating one access attempt.
#[derive(Debug, Clone)]
pub enum AccessOutcome {
    Allowed(Box<ShareRecord>),
    Denied(Denial),
}

impl AccessOutcome {
    pub fn code(&self) -> OutcomeCode {
        match self {
            AccessOutcome::Allowed(_) => OutcomeCode::Allowed,
            AccessOutcome::Denied(d) => d.reason.code(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessOutcome::Allowed(_))
    }

    pub fn share_token(&self) -> Option<&str> {
        match self {
            AccessOutcome::Allowed(record) => Some(&record.token),
            AccessOutcome::Denied(d) => d.share.as_deref(),
        }
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            AccessOutcome::Allowed(_) => None,
            AccessOutcome::Denied(d) => Some(d),
        }
    }
}

impl From<Denial> for AccessOutcome {
    fn from(d: Denial) -> Self {
        AccessOutcome::Denied(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_serialize_camel_case() {
        assert_eq!(serde_json::to_string(&OutcomeCode::UnauthorizedEmail).unwrap(), "\"unauthorizedEmail\"");
        assert_eq!(serde_json::to_string(&OutcomeCode::RateLimited).unwrap(), "\"rateLimited\"");
        assert_eq!(OutcomeCode::MalformedToken.to_string(), "malformedToken");
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(Stage::FormatCheck < Stage::DevGuard);
        assert!(Stage::DevGuard < Stage::RateLimitCheck);
        assert!(Stage::RateLimitCheck < Stage::Lookup);
        assert!(Stage::Lookup < Stage::StatusCheck);
        assert!(Stage::StatusCheck < Stage::ExpiryCheck);
        assert!(Stage::ExpiryCheck < Stage::WhitelistCheck);
        assert!(Stage::WhitelistCheck < Stage::ContentFetch);
    }

    #[test]
    fn test_denial_builders() {
        let d = Denial::new(Stage::Lookup, DenyReason::NotFound).with_fault("timeout");
        assert_eq!(d.fault.as_deref(), Some("timeout"));
        assert!(d.share.is_none());
        let outcome = AccessOutcome::from(d.for_share("tok"));
        assert_eq!(outcome.code(), OutcomeCode::NotFound);
        assert_eq!(outcome.share_token(), Some("tok"));
    }
}
