//! Public share endpoints.
//!
//! Both handlers run the same pipeline: evaluate the request, write exactly
//! one access log entry, then render through the sanitizer.

use std::time::Instant;

use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    http::{HeaderMap, Uri},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::AccessLogEntry;
use crate::guard::{AccessOutcome, AccessRequest, Denial, DenyReason, Stage};
use crate::http::request::{requester_email, ClientInfo};
use crate::http::response::{allowed_json, sanitize, uniform_denial};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::share::{Email, KeywordFilter, ShareRecord};

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ShareQuery {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailsQuery {
    pub email: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl EmailsQuery {
    pub fn page_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn page_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// Public view of a share. The mailbox owner's whitelist stays private.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareMetadata<'a> {
    pub token: &'a str,
    pub mailbox: &'a str,
    pub created_at: DateTime<Utc>,
    pub expire_time: Option<DateTime<Utc>>,
    pub keyword_filter: Option<&'a str>,
    pub rate_limit_per_second: u32,
    pub rate_limit_per_minute: u32,
    pub otp_limit_daily: u32,
    pub verification_code_limit: u32,
    pub has_whitelist: bool,
}

impl<'a> From<&'a ShareRecord> for ShareMetadata<'a> {
    fn from(record: &'a ShareRecord) -> Self {
        Self {
            token: &record.token,
            mailbox: &record.mailbox,
            created_at: record.created_at,
            expire_time: record.expire_at,
            keyword_filter: record.keyword_filter.as_deref(),
            rate_limit_per_second: record.rate_limit_per_second,
            rate_limit_per_minute: record.rate_limit_per_minute,
            otp_limit_daily: record.otp_limit_daily,
            verification_code_limit: record.verification_code_limit,
            has_whitelist: !record.whitelist.is_empty(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmailPage {
    pub emails: Vec<Email>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Malformed query strings fall back to defaults instead of producing an
/// extractor rejection with a distinguishable status.
fn query_or_default<T: serde::de::DeserializeOwned + Default>(uri: &Uri) -> T {
    Query::<T>::try_from_uri(uri).map(|Query(q)| q).unwrap_or_default()
}

/// Path rejections become an empty token so they flow through the pipeline
/// as malformed and are logged like any other request.
fn token_or_empty(path: Result<Path<String>, PathRejection>) -> String {
    path.map(|Path(token)| token).unwrap_or_default()
}

pub(crate) fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn access_request(state: &AppState, token: String, client: &ClientInfo, email: Option<&str>) -> AccessRequest {
    AccessRequest {
        token,
        client_ip: client.ip.clone(),
        requester_email: requester_email(email),
        deadline: state.guard.deadline(),
    }
}

/// `GET /share/{token}`
pub async fn get_share(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    client: ClientInfo,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let start = Instant::now();
    let query: ShareQuery = query_or_default(&uri);
    let req = access_request(&state, token_or_empty(path), &client, query.email.as_deref());

    let outcome = state.guard.evaluate(&req).await;
    state
        .logger
        .record(AccessLogEntry::from_outcome(&outcome, &client).with_request_id(request_id(&headers)));

    let response = sanitize(&outcome, |record| allowed_json(&ShareMetadata::from(record)));
    metrics::record_request_duration("share", start);
    response
}

/// `GET /share/emails/{token}`
pub async fn get_share_emails(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    client: ClientInfo,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let start = Instant::now();
    let query: EmailsQuery = query_or_default(&uri);
    let req = access_request(&state, token_or_empty(path), &client, query.email.as_deref());

    let outcome = state.guard.evaluate(&req).await;
    let (outcome, response, summary) = match outcome {
        AccessOutcome::Allowed(record) => {
            match req.deadline.run(state.mailboxes.list(&record.mailbox)).await {
                Ok(Ok(emails)) => {
                    let filtered = KeywordFilter::parse(record.keyword_filter.as_deref()).apply(emails);
                    let summary = filtered.summary();
                    let total = filtered.emails.len();
                    let (limit, offset) = (query.page_limit(), query.page_offset());
                    let page = EmailPage {
                        emails: filtered.emails.into_iter().skip(offset).take(limit).collect(),
                        total,
                        limit,
                        offset,
                    };
                    (AccessOutcome::Allowed(record), allowed_json(&page), Some(summary))
                }
                Ok(Err(e)) => {
                    metrics::record_store_failure("mailbox");
                    tracing::warn!(share = %record.token, error = %e, "Mailbox fetch failed");
                    (fetch_failure(&record, e), uniform_denial(), None)
                }
                Err(e) => {
                    metrics::record_store_failure("mailbox");
                    tracing::warn!(share = %record.token, "Mailbox fetch missed the request deadline");
                    (fetch_failure(&record, e), uniform_denial(), None)
                }
            }
        }
        denied @ AccessOutcome::Denied(_) => (denied, uniform_denial(), None),
    };

    let mut entry = AccessLogEntry::from_outcome(&outcome, &client).with_request_id(request_id(&headers));
    if let Some(summary) = summary {
        entry = entry.with_summary(summary);
    }
    state.logger.record(entry);

    metrics::record_request_duration("share_emails", start);
    response
}

fn fetch_failure(record: &ShareRecord, fault: impl std::fmt::Display) -> AccessOutcome {
    Denial::new(Stage::ContentFetch, DenyReason::NotFound)
        .for_share(&record.token)
        .with_fault(fault)
        .into()
}
