//! Single-purpose platform lookups backing the dedicated API routes.

use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::client;
use crate::config::UnfurlConfig;
use crate::error::{FetchError, FetchResult};

/// Tweet ids are numeric, 5 to 40 digits.
pub fn valid_tweet_id(id: &str) -> bool {
    (5..=40).contains(&id.len()) && id.chars().all(|c| c.is_ascii_digit())
}

pub struct EmbedClient {
    client: reqwest::Client,
    config: UnfurlConfig,
}

impl EmbedClient {
    pub fn new(client: reqwest::Client, config: UnfurlConfig) -> Self {
        Self { client, config }
    }

    /// Tweet JSON from the syndication endpoint.
    pub async fn tweet(&self, id: &str) -> FetchResult<Value> {
        if !valid_tweet_id(id) {
            return Err(FetchError::InvalidUrl {
                url: format!("tweet id {id}"),
            });
        }
        let endpoint = format!("{}?id={}&lang=en", self.config.tweet_base, id);
        client::fetch_json(&self.client, &endpoint, self.config.api_timeout).await
    }

    /// Reddit post JSON by id or URL.
    ///
    /// When the lookup fails but a URL was supplied, a degraded object
    /// carrying whatever the URL itself encodes (id, subreddit,
    /// permalink) is returned instead of an error.
    pub async fn reddit_post(&self, id: Option<&str>, url: Option<&str>) -> Option<Value> {
        let target = match (id, url) {
            (Some(id), _) => format!("{}/comments/{}.json?raw_json=1", self.config.reddit_base, id),
            (None, Some(url)) => {
                let path = Url::parse(url).ok()?.path().trim_end_matches('/').to_string();
                format!("{}{}.json?raw_json=1", self.config.reddit_base, path)
            }
            (None, None) => return None,
        };

        match client::fetch_json(&self.client, &target, self.config.api_timeout).await {
            Ok(body) => {
                let post = body
                    .get(0)
                    .and_then(|listing| listing.get("data"))
                    .and_then(|data| data.get("children"))
                    .and_then(|children| children.get(0))
                    .and_then(|child| child.get("data"))
                    .cloned();
                post.or(Some(body))
            }
            Err(e) => {
                warn!(target = %target, error = %e, "reddit lookup failed");
                url.map(degraded_reddit_object)
            }
        }
    }

    /// TikTok oEmbed with a synthesized fallback object.
    pub async fn tiktok(&self, url: &str) -> Value {
        let endpoint = format!(
            "{}?url={}",
            self.config.tiktok_oembed_base,
            client::urlencode(url)
        );
        match client::fetch_json(&self.client, &endpoint, self.config.api_timeout).await {
            Ok(body) => body,
            Err(e) => {
                debug!(url = %url, error = %e, "tiktok oembed failed, synthesizing fallback");
                let id = Url::parse(url)
                    .ok()
                    .and_then(|u| crate::handlers::tiktok::video_id(&u));
                json!({
                    "title": "TikTok Video",
                    "provider_name": "TikTok",
                    "embed_product_id": id,
                })
            }
        }
    }

    /// Resolve a pin URL (short links included) to its canonical form
    /// and extract the pin id when present.
    pub async fn resolve_pin(&self, url: &str) -> FetchResult<(String, Option<String>)> {
        let resolved = self.resolve_redirect(url).await?;
        let id = Url::parse(&resolved)
            .ok()
            .and_then(|u| pin_id(&u));
        Ok((resolved, id))
    }

    /// Follow redirects and report the final URL.
    pub async fn resolve_redirect(&self, url: &str) -> FetchResult<String> {
        let response = tokio::time::timeout(self.config.api_timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
            })??;
        Ok(response.url().to_string())
    }
}

/// id/subreddit/permalink recovered from the URL alone.
fn degraded_reddit_object(url: &str) -> Value {
    let mut id = None;
    let mut subreddit = None;
    if let Ok(parsed) = Url::parse(url) {
        let segments: Vec<&str> = parsed.path().split('/').filter(|s| !s.is_empty()).collect();
        for window in segments.windows(2) {
            match window[0] {
                "r" => subreddit = Some(window[1].to_string()),
                "comments" => id = Some(window[1].to_string()),
                _ => {}
            }
        }
    }
    json!({
        "id": id,
        "subreddit": subreddit,
        "permalink": url,
    })
}

fn pin_id(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
    segments
        .windows(2)
        .find(|pair| pair[0] == "pin")
        .map(|pair| pair[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tweet_id_validation() {
        assert!(valid_tweet_id("12345"));
        assert!(valid_tweet_id("1755555555555555555"));
        assert!(!valid_tweet_id("1234"));
        assert!(!valid_tweet_id("12a45"));
        assert!(!valid_tweet_id(&"9".repeat(41)));
    }

    #[test]
    fn test_degraded_reddit_object() {
        let value =
            degraded_reddit_object("https://www.reddit.com/r/rust/comments/abc123/some_title/");
        assert_eq!(value["id"], "abc123");
        assert_eq!(value["subreddit"], "rust");
        assert_eq!(
            value["permalink"],
            "https://www.reddit.com/r/rust/comments/abc123/some_title/"
        );
    }

    #[test]
    fn test_pin_id() {
        let url = Url::parse("https://www.pinterest.com/pin/1234567890/").unwrap();
        assert_eq!(pin_id(&url).as_deref(), Some("1234567890"));

        let board = Url::parse("https://www.pinterest.com/user/board/").unwrap();
        assert!(pin_id(&board).is_none());
    }
}
