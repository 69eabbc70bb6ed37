//! Client-facing projection of access outcomes.
//!
//! # Responsibilities
//! - Collapse every denial into one byte-identical 404
//! - Serialize allowed payloads as JSON with caching disabled
//!
//! # Design Decisions
//! - Denial reason, retry hints and faults never reach the client; rate
//!   limiting is folded into the same 404 as every other denial
//! - Header set is fixed so responses cannot be told apart by headers

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::guard::AccessOutcome;
use crate::share::model::ShareRecord;

pub const DENIAL_BODY: &str = "Not Found";
pub const NO_STORE: &str = "no-store, no-cache, must-revalidate";

fn no_cache_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
}

/// The one response every denial maps to.
pub fn uniform_denial() -> Response {
    let mut response = Response::new(Body::from(DENIAL_BODY));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    no_cache_headers(&mut response);
    response
}

/// JSON 200 with caching disabled.
pub fn allowed_json<T: Serialize>(payload: &T) -> Response {
    let mut response = match serde_json::to_vec(payload) {
        Ok(bytes) => {
            let mut r = Response::new(Body::from(bytes));
            r.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            r
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize share payload");
            return uniform_denial();
        }
    };
    no_cache_headers(&mut response);
    response
}

/// Sanitize an outcome: an allowed record is rendered by `render`, every
/// denial becomes the uniform 404.
pub fn sanitize<F>(outcome: &AccessOutcome, render: F) -> Response
where
    F: FnOnce(&ShareRecord) -> Response,
{
    match outcome {
        AccessOutcome::Allowed(record) => render(record),
        AccessOutcome::Denied(_) => uniform_denial(),
    }
}

/// Router fallback: unknown paths look exactly like denied shares.
pub async fn fallback() -> impl IntoResponse {
    uniform_denial()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{Denial, DenyReason, LimitScope, Stage};
    use http_body_util::BodyExt;

    async fn parts(r: Response) -> (StatusCode, Vec<(String, String)>, Vec<u8>) {
        let status = r.status();
        let mut headers: Vec<_> = r
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap().to_string()))
            .collect();
        headers.sort();
        let body = r.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, headers, body)
    }

    #[tokio::test]
    async fn test_uniform_denial_shape() {
        let (status, headers, body) = parts(uniform_denial()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, b"Not Found");
        assert!(headers.contains(&("content-type".into(), "text/plain; charset=utf-8".into())));
        assert!(headers.contains(&("cache-control".into(), NO_STORE.into())));
        assert!(headers.contains(&("pragma".into(), "no-cache".into())));
        assert!(headers.contains(&("expires".into(), "0".into())));
    }

    #[tokio::test]
    async fn test_every_denial_reason_is_identical() {
        let reasons = [
            DenyReason::MalformedToken,
            DenyReason::RateLimited { scope: LimitScope::Share, retry_after_secs: 17 },
            DenyReason::NotFound,
            DenyReason::Disabled,
            DenyReason::Expired,
            DenyReason::UnauthorizedEmail,
        ];
        let baseline = parts(uniform_denial()).await;
        for reason in reasons {
            let outcome = AccessOutcome::Denied(Denial::new(Stage::Lookup, reason).with_fault("x"));
            let got = parts(sanitize(&outcome, |_| allowed_json(&serde_json::json!({"leak": true})))).await;
            assert_eq!(got, baseline);
        }
    }

    #[tokio::test]
    async fn test_allowed_json_disables_caching() {
        let (status, headers, body) = parts(allowed_json(&serde_json::json!({"ok": 1}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.contains(&("content-type".into(), "application/json".into())));
        assert!(headers.contains(&("cache-control".into(), NO_STORE.into())));
        assert_eq!(body, br#"{"ok":1}"#);
    }
}
