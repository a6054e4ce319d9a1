//! YouTube handler: concurrent oEmbed lookup + thumbnail-quality probe.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::client;
use crate::config::UnfurlConfig;
use crate::error::FetchResult;
use crate::registry::MetadataHandler;
use crate::types::MetadataResult;

/// Thumbnail qualities probed in descending order. `hqdefault` exists for
/// every video, so it doubles as the unvalidated last resort.
const THUMB_QUALITIES: &[&str] = &["maxresdefault", "sddefault", "hqdefault"];

pub struct YoutubeHandler {
    client: reqwest::Client,
    config: UnfurlConfig,
}

impl YoutubeHandler {
    pub fn new(client: reqwest::Client, config: UnfurlConfig) -> Self {
        Self { client, config }
    }

    async fn fetch_oembed(&self, watch_url: &str) -> Option<(String, Option<String>)> {
        let endpoint = format!(
            "{}?url={}&format=json",
            self.config.youtube_oembed_base,
            client::urlencode(watch_url)
        );
        let body = client::fetch_json(&self.client, &endpoint, self.config.api_timeout)
            .await
            .ok()?;
        let title = body.get("title")?.as_str()?.to_string();
        let author = body
            .get("author_name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        Some((title, author))
    }

    /// Probe thumbnails best-first; the first probe that reports an
    /// actual image body wins.
    async fn probe_thumbnail(&self, video_id: &str) -> Option<String> {
        for quality in THUMB_QUALITIES {
            let thumb_url = format!(
                "{}/{}/{}.jpg",
                self.config.youtube_thumb_base, video_id, quality
            );
            match client::head(&self.client, &thumb_url, self.config.head_timeout).await {
                Ok(probe)
                    if (200..300).contains(&probe.status)
                        && probe.content_length.map(|len| len > 0).unwrap_or(true) =>
                {
                    return Some(thumb_url);
                }
                Ok(probe) => {
                    debug!(url = %thumb_url, status = probe.status, "thumbnail probe missed");
                }
                Err(e) => {
                    debug!(url = %thumb_url, error = %e, "thumbnail probe failed");
                }
            }
        }
        None
    }
}

#[async_trait]
impl MetadataHandler for YoutubeHandler {
    async fn extract(&self, url: &Url) -> FetchResult<MetadataResult> {
        let video_id = extract_video_id(url);

        let (oembed, thumbnail) = match &video_id {
            Some(id) => {
                let watch_url = format!("https://www.youtube.com/watch?v={id}");
                // The two lookups are independent; run them concurrently
                // and accept whichever succeeds.
                tokio::join!(self.fetch_oembed(&watch_url), self.probe_thumbnail(id))
            }
            None => (self.fetch_oembed(url.as_str()).await, None),
        };

        let image = thumbnail.or_else(|| {
            // All probes failed: the lowest quality is served for every
            // video, use it without validation.
            video_id
                .as_deref()
                .map(|id| format!("{}/{}/hqdefault.jpg", self.config.youtube_thumb_base, id))
        });

        let source = if oembed.is_some() {
            "youtube-oembed"
        } else {
            "youtube-scrape"
        };
        let mut result = MetadataResult::empty(url.as_str(), source);
        result.favicon = Some(self.config.favicon_for("youtube.com"));
        match oembed {
            Some((title, author)) => {
                result.title = Some(title);
                result.description = author;
            }
            None => {
                result.title = Some(format!(
                    "Video - {}",
                    video_id.as_deref().unwrap_or("unknown")
                ));
            }
        }
        result = result.with_images(image.into_iter().collect());
        // YouTube thumbnail URLs are stable; no re-hosting needed.
        result.should_persist_image = false;
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "youtube"
    }
}

/// Video id from watch, shortlink, shorts, embed and live URL shapes.
fn extract_video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();

    if host.ends_with("youtu.be") {
        return first_path_segment(url);
    }

    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
        if !id.is_empty() {
            return Some(id.into_owned());
        }
    }

    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["shorts", id, ..] | ["embed", id, ..] | ["live", id, ..] | ["v", id, ..] => {
            Some((*id).to_string())
        }
        _ => None,
    }
}

fn first_path_segment(url: &Url) -> Option<String> {
    url.path()
        .split('/')
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}
