//! Audit log records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::guard::{AccessOutcome, DenyReason, LimitScope, OutcomeCode, Stage};
use crate::http::request::ClientInfo;
use crate::http::user_agent::UserAgentInfo;

/// One terminal outcome, with the detail the client never sees.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    pub timestamp: DateTime<Utc>,
    pub request_id: Option<String>,
    /// Resolved share token, when the lookup succeeded.
    pub share_id: Option<String>,
    pub ip: String,
    pub user_agent: UserAgentInfo,
    pub outcome: OutcomeCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_scope: Option<LimitScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_summary: Option<String>,
}

impl AccessLogEntry {
    pub fn from_outcome(outcome: &AccessOutcome, client: &ClientInfo) -> Self {
        let denial = outcome.denial();
        let (limit_scope, retry_after_secs) = match denial.map(|d| &d.reason) {
            Some(DenyReason::RateLimited { scope, retry_after_secs }) => (Some(*scope), Some(*retry_after_secs)),
            _ => (None, None),
        };

        Self {
            timestamp: Utc::now(),
            request_id: None,
            share_id: outcome.share_token().map(str::to_string),
            ip: client.ip.clone(),
            user_agent: client.user_agent,
            outcome: outcome.code(),
            stage: denial.map(|d| d.stage),
            limit_scope,
            retry_after_secs,
            fault: denial.and_then(|d| d.fault.clone()),
            matched_summary: None,
        }
    }

    pub fn with_request_id(mut self, id: Option<String>) -> Self {
        self.request_id = id;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.matched_summary = Some(summary.into());
        self
    }
}
