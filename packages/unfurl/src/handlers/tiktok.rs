//! TikTok handler: oEmbed → HTML scrape → synthesized stub.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::client;
use crate::config::UnfurlConfig;
use crate::error::FetchResult;
use crate::persist::needs_persistence;
use crate::registry::MetadataHandler;
use crate::scrape;
use crate::types::MetadataResult;

pub struct TiktokHandler {
    client: reqwest::Client,
    config: UnfurlConfig,
}

impl TiktokHandler {
    pub fn new(client: reqwest::Client, config: UnfurlConfig) -> Self {
        Self { client, config }
    }

    /// Tier 1: oEmbed. Only a thumbnail-bearing response counts.
    async fn try_oembed(&self, url: &Url) -> Option<MetadataResult> {
        let body = self.fetch_oembed(url.as_str()).await?;

        let thumbnail = body.get("thumbnail_url")?.as_str()?.to_string();
        let mut result = self.base_result(url.as_str(), "tiktok-oembed");
        result.title = body
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        result.description = body
            .get("author_name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        result = result.with_images(vec![thumbnail]);
        result.should_persist_image = result
            .image
            .as_deref()
            .map(|image| needs_persistence(image, &self.config))
            .unwrap_or(false);
        Some(result)
    }

    /// Raw oEmbed lookup; shared with the `/api/tiktok` route.
    pub async fn fetch_oembed(&self, url: &str) -> Option<serde_json::Value> {
        let endpoint = format!(
            "{}?url={}",
            self.config.tiktok_oembed_base,
            client::urlencode(url)
        );
        client::fetch_json(&self.client, &endpoint, self.config.api_timeout)
            .await
            .ok()
    }

    /// Tier 2: regex og extraction from the page.
    async fn try_scrape(&self, url: &Url) -> Option<MetadataResult> {
        let html = client::fetch_text(&self.client, url.as_str(), self.config.api_timeout)
            .await
            .ok()?;

        let title = scrape::meta_content(&html, "og:title").or_else(|| scrape::html_title(&html));
        let image = scrape::meta_content(&html, "og:image");
        if title.is_none() && image.is_none() {
            return None;
        }

        let mut result = self.base_result(url.as_str(), "tiktok-scrape");
        result.title = title;
        result.description = scrape::meta_content(&html, "og:description");
        result = result.with_images(image.into_iter().collect());
        result.should_persist_image = result
            .image
            .as_deref()
            .map(|img| needs_persistence(img, &self.config))
            .unwrap_or(false);
        Some(result)
    }

    fn base_result(&self, url: &str, source: &str) -> MetadataResult {
        let mut result = MetadataResult::empty(url, source);
        result.favicon = Some(self.config.favicon_for("tiktok.com"));
        result
    }
}

#[async_trait]
impl MetadataHandler for TiktokHandler {
    async fn extract(&self, url: &Url) -> FetchResult<MetadataResult> {
        if let Some(result) = self.try_oembed(url).await {
            return Ok(result);
        }
        debug!(url = %url, "oembed tier missed");

        if let Some(result) = self.try_scrape(url).await {
            return Ok(result);
        }
        debug!(url = %url, "scrape tier missed, returning stub");

        let mut stub = self.base_result(url.as_str(), "tiktok-fallback");
        stub.title = Some(match video_id(url) {
            Some(id) => format!("TikTok Video {id}"),
            None => "TikTok Video".to_string(),
        });
        Ok(stub)
    }

    fn name(&self) -> &'static str {
        "tiktok"
    }
}

/// Numeric video id from `/@user/video/<id>` paths.
pub fn video_id(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
    segments
        .windows(2)
        .find(|pair| pair[0] == "video")
        .map(|pair| pair[1].to_string())
        .filter(|id| id.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_from_canonical_url() {
        let url = Url::parse("https://www.tiktok.com/@someone/video/7123456789012345678").unwrap();
        assert_eq!(video_id(&url).as_deref(), Some("7123456789012345678"));
    }

    #[test]
    fn test_no_video_id_on_shortlink() {
        let url = Url::parse("https://vm.tiktok.com/ZMabcdef/").unwrap();
        assert!(video_id(&url).is_none());
    }
}
