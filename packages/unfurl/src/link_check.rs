//! Liveness probing for bookmarked links.

use serde::Serialize;
use tracing::debug;

use crate::config::UnfurlConfig;
use crate::guard::UrlGuard;

/// Batch requests are capped at this many URLs.
pub const MAX_BATCH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Ok,
    Broken,
    Redirected,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheckResult {
    pub url: String,
    pub status: LinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

enum ProbeError {
    Timeout,
    Transport(reqwest::Error),
}

pub struct LinkChecker {
    /// Client with redirects disabled, so 3xx responses are observable.
    client: reqwest::Client,
    config: UnfurlConfig,
    /// Every probe target is screened before any request goes out.
    guard: UrlGuard,
}

impl LinkChecker {
    pub fn new(config: UnfurlConfig, guard: UrlGuard) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(crate::client::USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            guard,
        }
    }

    /// Probe one URL. HEAD first; some servers reject HEAD outright, so
    /// 405/501 falls back to GET. URLs the guard rejects are reported as
    /// `error` without being probed.
    pub async fn check(&self, url: &str) -> LinkCheckResult {
        if let Err(e) = self.guard.validate(url) {
            debug!(url = %url, error = %e, "link probe target rejected by url guard");
            return LinkCheckResult {
                url: url.to_string(),
                status: LinkStatus::Error,
                redirect_url: None,
            };
        }

        let head = self.request(reqwest::Method::HEAD, url).await;
        let response = match head {
            Ok(r) if matches!(r.status().as_u16(), 405 | 501) => {
                self.request(reqwest::Method::GET, url).await
            }
            other => other,
        };

        match response {
            Ok(r) if r.status().is_redirection() => {
                let redirect_url = r
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                LinkCheckResult {
                    url: url.to_string(),
                    status: LinkStatus::Redirected,
                    redirect_url,
                }
            }
            Ok(r) if r.status().is_success() => LinkCheckResult {
                url: url.to_string(),
                status: LinkStatus::Ok,
                redirect_url: None,
            },
            Ok(r) => {
                debug!(url = %url, status = %r.status(), "link probe returned error status");
                LinkCheckResult {
                    url: url.to_string(),
                    status: LinkStatus::Broken,
                    redirect_url: None,
                }
            }
            Err(ProbeError::Timeout) => {
                debug!(url = %url, "link probe timed out");
                LinkCheckResult {
                    url: url.to_string(),
                    status: LinkStatus::Error,
                    redirect_url: None,
                }
            }
            Err(ProbeError::Transport(e)) => {
                debug!(url = %url, error = %e, "link probe failed");
                LinkCheckResult {
                    url: url.to_string(),
                    status: LinkStatus::Error,
                    redirect_url: None,
                }
            }
        }
    }

    /// Probe a batch sequentially, honoring [`MAX_BATCH`].
    pub async fn check_batch(&self, urls: &[String]) -> Vec<LinkCheckResult> {
        let mut results = Vec::with_capacity(urls.len().min(MAX_BATCH));
        for url in urls.iter().take(MAX_BATCH) {
            results.push(self.check(url).await);
        }
        results
    }

    async fn request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> Result<reqwest::Response, ProbeError> {
        tokio::time::timeout(
            self.config.api_timeout,
            self.client.request(method, url).send(),
        )
        .await
        .map_err(|_| ProbeError::Timeout)?
        .map_err(ProbeError::Transport)
    }
}
