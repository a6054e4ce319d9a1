//! Shared HTTP client construction and fetch helpers.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};

/// Browser-like User-Agent; several platforms serve degraded meta tags to
/// obvious bots.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Build the shared client used for page and API fetches.
///
/// Per-request deadlines are applied at call sites ([`fetch_text`],
/// [`head`]) so one client serves several timeout classes.
pub fn build_client() -> reqwest::Client {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .unwrap_or_default()
}

/// Fetch a URL as text with an explicit deadline.
///
/// Non-success statuses and timeouts are both fetch errors; callers treat
/// them as tier misses.
pub async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> FetchResult<String> {
    debug!(url = %url, "fetch starting");
    let response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout {
            url: url.to_string(),
        })??;

    let status = response.status();
    if !status.is_success() {
        warn!(url = %url, status = %status, "fetch returned non-success status");
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = tokio::time::timeout(timeout, response.text())
        .await
        .map_err(|_| FetchError::Timeout {
            url: url.to_string(),
        })??;

    Ok(body)
}

/// Fetch a URL and parse the body as JSON.
pub async fn fetch_json(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> FetchResult<serde_json::Value> {
    let body = fetch_text(client, url, timeout).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Outcome of a HEAD probe against an image candidate.
#[derive(Debug, Clone)]
pub struct HeadProbe {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl HeadProbe {
    /// Whether the probe describes an acceptable image of at most
    /// `max_bytes`.
    pub fn is_acceptable_image(&self, max_bytes: u64) -> bool {
        if !(200..300).contains(&self.status) {
            return false;
        }
        let is_image = self
            .content_type
            .as_deref()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return false;
        }
        match self.content_length {
            Some(len) => len <= max_bytes,
            None => true,
        }
    }
}

/// HEAD a URL and report status, content type and length.
pub async fn head(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> FetchResult<HeadProbe> {
    let response = tokio::time::timeout(timeout, client.head(url).send())
        .await
        .map_err(|_| FetchError::Timeout {
            url: url.to_string(),
        })??;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let content_length = response.content_length().or_else(|| {
        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    });

    Ok(HeadProbe {
        status: response.status().as_u16(),
        content_type,
        content_length,
    })
}

/// Download raw bytes (used by the persistence queue).
pub async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> FetchResult<(Vec<u8>, Option<String>)> {
    let response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout {
            url: url.to_string(),
        })??;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let bytes = tokio::time::timeout(timeout, response.bytes())
        .await
        .map_err(|_| FetchError::Timeout {
            url: url.to_string(),
        })??;

    Ok((bytes.to_vec(), content_type))
}

/// Resolve a possibly-relative candidate URL against its page.
pub fn absolutize(base: &Url, candidate: &str) -> Option<String> {
    base.join(candidate).ok().map(|u| u.to_string())
}

/// Percent-encode a value for use in a query string. URLs passed as the
/// `url=` parameter of oEmbed endpoints carry `&` and `?` of their own
/// and would otherwise split the outer query.
pub(crate) fn urlencode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_rejects_non_image() {
        let probe = HeadProbe {
            status: 200,
            content_type: Some("text/html".to_string()),
            content_length: Some(100),
        };
        assert!(!probe.is_acceptable_image(5_000_000));
    }

    #[test]
    fn test_probe_rejects_oversize() {
        let probe = HeadProbe {
            status: 200,
            content_type: Some("image/jpeg".to_string()),
            content_length: Some(6_000_000),
        };
        assert!(!probe.is_acceptable_image(5_000_000));
    }

    #[test]
    fn test_probe_rejects_error_status() {
        let probe = HeadProbe {
            status: 404,
            content_type: Some("image/png".to_string()),
            content_length: Some(100),
        };
        assert!(!probe.is_acceptable_image(5_000_000));
    }

    #[test]
    fn test_probe_accepts_image_without_length() {
        let probe = HeadProbe {
            status: 200,
            content_type: Some("image/png".to_string()),
            content_length: None,
        };
        assert!(probe.is_acceptable_image(5_000_000));
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(
            urlencode("https://a.com/b?c=d&e=f"),
            "https%3A%2F%2Fa.com%2Fb%3Fc%3Dd%26e%3Df"
        );
    }

    #[test]
    fn test_absolutize() {
        let base = Url::parse("https://example.com/products/1").unwrap();
        assert_eq!(
            absolutize(&base, "/img/a.jpg").as_deref(),
            Some("https://example.com/img/a.jpg")
        );
        assert_eq!(
            absolutize(&base, "https://cdn.example.com/a.jpg").as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
    }
}
