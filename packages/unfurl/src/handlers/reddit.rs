//! Reddit handler: oEmbed → public JSON API → HTML scrape → stub.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::client;
use crate::config::UnfurlConfig;
use crate::error::FetchResult;
use crate::persist::needs_persistence;
use crate::registry::MetadataHandler;
use crate::scrape;
use crate::types::MetadataResult;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

pub struct RedditHandler {
    client: reqwest::Client,
    config: UnfurlConfig,
}

impl RedditHandler {
    pub fn new(client: reqwest::Client, config: UnfurlConfig) -> Self {
        Self { client, config }
    }

    /// Canonical post URL on the main domain. Shortlinks (`redd.it/<id>`)
    /// become comment permalinks.
    fn canonical_url(&self, url: &Url) -> String {
        let host = url.host_str().unwrap_or("");
        if host.ends_with("redd.it") {
            format!(
                "{}/comments{}",
                self.config.reddit_base,
                url.path().trim_end_matches('/')
            )
        } else {
            format!(
                "{}{}",
                self.config.reddit_base,
                url.path().trim_end_matches('/')
            )
        }
    }

    /// Tier 1: oEmbed. A result without a thumbnail is a miss; a
    /// thumbnail-less partial would shadow the richer JSON tier.
    async fn try_oembed(&self, url: &Url) -> Option<MetadataResult> {
        let endpoint = format!(
            "{}/oembed?url={}",
            self.config.reddit_base,
            client::urlencode(url.as_str())
        );
        let body = client::fetch_json(&self.client, &endpoint, self.config.api_timeout)
            .await
            .ok()?;

        let thumbnail = body.get("thumbnail_url")?.as_str()?.to_string();
        let title = body
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let mut result = self.base_result(url.as_str(), "reddit-oembed");
        result.title = title;
        result = result.with_images(vec![thumbnail]);
        result.should_persist_image = self.persist_flag(&result);
        Some(result)
    }

    /// Tier 2: public JSON API for the post.
    async fn try_json_api(&self, url: &Url) -> Option<MetadataResult> {
        let endpoint = format!("{}.json?raw_json=1", self.canonical_url(url));
        let body = client::fetch_json(&self.client, &endpoint, self.config.api_timeout)
            .await
            .ok()?;

        let post = body
            .get(0)?
            .get("data")?
            .get("children")?
            .get(0)?
            .get("data")?;

        let title = post
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let description = post
            .get("selftext")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.chars().take(300).collect::<String>());

        let images = post_images(post);
        if title.is_none() && images.is_empty() {
            return None;
        }

        let mut result = self.base_result(url.as_str(), "reddit-json");
        result.title = title;
        result.description = description;
        result = result.with_images(images);
        result.should_persist_image = self.persist_flag(&result);
        Some(result)
    }

    /// Tier 3: regex og extraction from the canonical page.
    async fn try_scrape(&self, url: &Url) -> Option<MetadataResult> {
        let html = client::fetch_text(&self.client, &self.canonical_url(url), self.config.api_timeout)
            .await
            .ok()?;

        let title = scrape::meta_content(&html, "og:title").or_else(|| scrape::html_title(&html));
        let image = scrape::meta_content(&html, "og:image");
        if title.is_none() && image.is_none() {
            return None;
        }

        let mut result = self.base_result(url.as_str(), "reddit-scrape");
        result.title = title;
        result.description = scrape::meta_content(&html, "og:description");
        result = result.with_images(image.into_iter().collect());
        result.should_persist_image = self.persist_flag(&result);
        Some(result)
    }

    fn base_result(&self, url: &str, source: &str) -> MetadataResult {
        let mut result = MetadataResult::empty(url, source);
        result.favicon = Some(self.config.favicon_for("reddit.com"));
        result
    }

    fn persist_flag(&self, result: &MetadataResult) -> bool {
        result
            .image
            .as_deref()
            .map(|image| needs_persistence(image, &self.config))
            .unwrap_or(false)
    }
}

#[async_trait]
impl MetadataHandler for RedditHandler {
    async fn extract(&self, url: &Url) -> FetchResult<MetadataResult> {
        if let Some(result) = self.try_oembed(url).await {
            return Ok(result);
        }
        debug!(url = %url, "oembed tier missed");

        if let Some(result) = self.try_json_api(url).await {
            return Ok(result);
        }
        debug!(url = %url, "json tier missed");

        if let Some(result) = self.try_scrape(url).await {
            return Ok(result);
        }
        debug!(url = %url, "scrape tier missed, returning stub");

        let mut stub = self.base_result(url.as_str(), "reddit-fallback");
        stub.title = Some("Reddit Post".to_string());
        Ok(stub)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}

/// Ordered image list for a post.
///
/// Galleries follow the explicit `gallery_data.items` order with
/// `media_metadata` key order as the fallback; video posts use the
/// preview thumbnail; direct image links are recognized by extension.
fn post_images(post: &Value) -> Vec<String> {
    // Gallery post
    if post.get("is_gallery").and_then(|v| v.as_bool()) == Some(true) {
        if let Some(metadata) = post.get("media_metadata").and_then(|v| v.as_object()) {
            let ordered_ids: Vec<String> = post
                .get("gallery_data")
                .and_then(|g| g.get("items"))
                .and_then(|v| v.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.get("media_id").and_then(|v| v.as_str()))
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_else(|| metadata.keys().cloned().collect());

            let images: Vec<String> = ordered_ids
                .iter()
                .filter_map(|id| gallery_image_url(metadata.get(id)?))
                .collect();
            if !images.is_empty() {
                return images;
            }
        }
    }

    // Video post: preview thumbnail
    if post.get("is_video").and_then(|v| v.as_bool()) == Some(true) {
        if let Some(preview) = preview_image(post) {
            return vec![preview];
        }
    }

    // Direct image link
    if let Some(link) = post
        .get("url_overridden_by_dest")
        .or_else(|| post.get("url"))
        .and_then(|v| v.as_str())
    {
        let lower = link.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.iter().any(|ext| {
            lower.ends_with(ext) || lower.contains(&format!("{ext}?"))
        }) {
            return vec![link.to_string()];
        }
    }

    // Link post with a preview rendering
    preview_image(post).into_iter().collect()
}

fn gallery_image_url(entry: &Value) -> Option<String> {
    let source = entry.get("s")?;
    source
        .get("u")
        .or_else(|| source.get("gif"))
        .and_then(|v| v.as_str())
        .map(|s| scrape::decode_entities(s))
}

fn preview_image(post: &Value) -> Option<String> {
    post.get("preview")?
        .get("images")?
        .get(0)?
        .get("source")?
        .get("url")
        .and_then(|v| v.as_str())
        .map(|s| scrape::decode_entities(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gallery_follows_item_order() {
        let post = json!({
            "is_gallery": true,
            "gallery_data": {"items": [{"media_id": "b"}, {"media_id": "a"}]},
            "media_metadata": {
                "a": {"s": {"u": "https://preview.redd.it/a.jpg"}},
                "b": {"s": {"u": "https://preview.redd.it/b.jpg"}}
            }
        });
        assert_eq!(
            post_images(&post),
            vec![
                "https://preview.redd.it/b.jpg".to_string(),
                "https://preview.redd.it/a.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_gallery_without_item_order_uses_key_order() {
        let post = json!({
            "is_gallery": true,
            "media_metadata": {
                "a": {"s": {"u": "https://preview.redd.it/a.jpg"}},
                "b": {"s": {"u": "https://preview.redd.it/b.jpg"}}
            }
        });
        let images = post_images(&post);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn test_video_post_uses_preview() {
        let post = json!({
            "is_video": true,
            "preview": {"images": [{"source": {"url": "https://external-preview.redd.it/v.png?s=sig"}}]}
        });
        assert_eq!(
            post_images(&post),
            vec!["https://external-preview.redd.it/v.png?s=sig".to_string()]
        );
    }

    #[test]
    fn test_direct_image_link_by_extension() {
        let post = json!({"url": "https://i.redd.it/photo.jpeg"});
        assert_eq!(post_images(&post), vec!["https://i.redd.it/photo.jpeg".to_string()]);
    }

    #[test]
    fn test_non_image_link_yields_nothing() {
        let post = json!({"url": "https://example.com/article"});
        assert!(post_images(&post).is_empty());
    }

}
