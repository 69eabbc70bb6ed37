//! Development-time remote guard.
//!
//! Delegates the allow/deny verdict to another deployment's share endpoint.
//! Shares no state with the local limiter and denies on every failure.

use std::time::Duration;

use url::Url;

use crate::config::DevGuardConfig;

/// Verdict from the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteVerdict {
    Allow,
    Deny,
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteGuardError {
    #[error("invalid dev guard endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct RemoteGuard {
    client: reqwest::Client,
    endpoint: Url,
}

impl RemoteGuard {
    pub fn from_config(config: &DevGuardConfig) -> Result<Self, RemoteGuardError> {
        let endpoint = Url::parse(&config.endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client, endpoint })
    }

    fn share_url(&self, token: &str) -> Option<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut().ok()?.pop_if_empty().push("share").push(token);
        Some(url)
    }

    /// Ask the remote endpoint about `token`. Only a 2xx answer allows.
    pub async fn verify(&self, token: &str, client_ip: &str) -> RemoteVerdict {
        let Some(url) = self.share_url(token) else {
            return RemoteVerdict::Deny;
        };

        match self.client.get(url).header("CF-Connecting-IP", client_ip).send().await {
            Ok(res) if res.status().is_success() => RemoteVerdict::Allow,
            Ok(res) => {
                tracing::debug!(status = %res.status(), "Remote guard denied share access");
                RemoteVerdict::Deny
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote guard unreachable, denying");
                RemoteVerdict::Deny
            }
        }
    }
}
