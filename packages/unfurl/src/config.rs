//! Library tunables.

use std::time::Duration;

/// Configuration for the extraction pipeline.
///
/// Endpoint bases are overridable so tests can point platform lookups at
/// a local fixture server.
#[derive(Debug, Clone)]
pub struct UnfurlConfig {
    /// Page HTML fetch deadline
    pub page_timeout: Duration,
    /// Platform API / oEmbed fetch deadline
    pub api_timeout: Duration,
    /// Per-image HEAD validation deadline
    pub head_timeout: Duration,
    /// Full-article extraction deadline
    pub article_timeout: Duration,
    /// Reject candidate images larger than this
    pub max_image_bytes: u64,
    /// Validate at most this many image candidates
    pub max_image_candidates: usize,
    /// Bounded concurrency for the persistence queue
    pub queue_concurrency: usize,
    /// Processed-set entries retained before oldest are evicted
    pub processed_capacity: usize,
    /// Favicon service URL prefix, completed with the page domain
    pub favicon_service: String,
    /// Hostname marker identifying URLs already in durable storage
    pub durable_host_marker: String,
    /// Domains known to issue expiring signed image URLs
    pub expiring_domains: Vec<String>,
    /// Query parameters signalling a time-limited URL
    pub expiry_params: Vec<String>,
    /// Reddit API base (oEmbed + public JSON)
    pub reddit_base: String,
    /// YouTube oEmbed base
    pub youtube_oembed_base: String,
    /// YouTube thumbnail host
    pub youtube_thumb_base: String,
    /// TikTok oEmbed base
    pub tiktok_oembed_base: String,
    /// Tweet syndication endpoint base
    pub tweet_base: String,
}

impl Default for UnfurlConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(10),
            api_timeout: Duration::from_secs(8),
            head_timeout: Duration::from_secs(3),
            article_timeout: Duration::from_secs(15),
            max_image_bytes: 5 * 1024 * 1024,
            max_image_candidates: 10,
            queue_concurrency: 2,
            processed_capacity: 10_000,
            favicon_service: "https://www.google.com/s2/favicons?sz=64&domain=".to_string(),
            durable_host_marker: ".convex.cloud".to_string(),
            expiring_domains: vec![
                "preview.redd.it".to_string(),
                "external-preview.redd.it".to_string(),
                "tiktokcdn.com".to_string(),
                "tiktokcdn-us.com".to_string(),
                "fbcdn.net".to_string(),
                "cdninstagram.com".to_string(),
                "twimg.com".to_string(),
                "pinimg.com".to_string(),
            ],
            expiry_params: vec![
                "x-expires".to_string(),
                "X-Amz-Expires".to_string(),
                "Expires".to_string(),
                "expires".to_string(),
                "se".to_string(),
                "token".to_string(),
            ],
            reddit_base: "https://www.reddit.com".to_string(),
            youtube_oembed_base: "https://www.youtube.com/oembed".to_string(),
            youtube_thumb_base: "https://i.ytimg.com/vi".to_string(),
            tiktok_oembed_base: "https://www.tiktok.com/oembed".to_string(),
            tweet_base: "https://cdn.syndication.twimg.com/tweet-result".to_string(),
        }
    }
}

impl UnfurlConfig {
    /// Favicon service URL for a page domain.
    pub fn favicon_for(&self, domain: &str) -> String {
        format!("{}{}", self.favicon_service, domain)
    }
}
