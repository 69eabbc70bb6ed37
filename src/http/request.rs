//! Requester identity extraction.
//!
//! # Responsibilities
//! - Resolve the requester IP from proxy headers
//! - Parse the User-Agent for auditing
//! - Normalize the optional requester email
//!
//! # Design Decisions
//! - `CF-Connecting-IP` wins over `X-Forwarded-For`; only the first
//!   forwarded hop is used
//! - Nothing here influences the access decision except the IP (as a
//!   rate-limit key) and the email (for the whitelist)

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::http::user_agent::UserAgentInfo;
use crate::share::model::normalize_email;

pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const UNKNOWN_IP: &str = "Unknown";

/// Requester IP as recorded and rate-limited.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header(CF_CONNECTING_IP) {
        return ip.to_string();
    }
    header(X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| UNKNOWN_IP.to_string(), str::to_string)
}

/// Blank addresses count as absent.
pub fn requester_email(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_email).filter(|e| !e.is_empty())
}

/// Who is asking: IP plus parsed user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: UserAgentInfo,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ua = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok());
        Self {
            ip: client_ip(headers),
            user_agent: UserAgentInfo::parse(ua),
        }
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientInfo::from_headers(&parts.headers))
    }
}
