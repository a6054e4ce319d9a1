//! Core data model: the normalized metadata record and the site taxonomy.

use serde::{Deserialize, Serialize};
use url::Url;

/// Normalized metadata for a bookmark preview.
///
/// Every handler produces one of these; the only guaranteed-populated
/// fields are `domain` and `source`. When `images` is present and `image`
/// is non-null, `images[0]` is always the primary image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Primary image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Image gallery; includes the primary image first when more than one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    /// Hostname with `www.` stripped; literal `"unknown"` on parse failure
    pub domain: String,
    /// Handler identifier plus tier, e.g. `"reddit-json"`
    pub source: String,
    /// True only when the image is known or suspected to expire and is
    /// not already in durable storage
    #[serde(default)]
    pub should_persist_image: bool,
}

impl MetadataResult {
    /// All-null shell with a populated domain. The recovery value for
    /// total extraction failure.
    pub fn empty(url: &str, source: impl Into<String>) -> Self {
        Self {
            title: None,
            description: None,
            image: None,
            images: None,
            favicon: None,
            domain: domain_of(url),
            source: source.into(),
            should_persist_image: false,
        }
    }

    /// Set the primary image and keep the gallery invariant: the gallery
    /// is only kept when it holds more than one entry, and the primary
    /// image leads it.
    pub fn with_images(mut self, mut images: Vec<String>) -> Self {
        images.dedup();
        match images.len() {
            0 => {
                self.image = None;
                self.images = None;
            }
            1 => {
                self.image = Some(images.remove(0));
                self.images = None;
            }
            _ => {
                self.image = Some(images[0].clone());
                self.images = Some(images);
            }
        }
        self
    }
}

/// Extract the `www.`-stripped hostname from a raw URL string.
///
/// Falls back to the literal `"unknown"` so the domain invariant holds
/// even for unparseable input.
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .map(|h| h.trim_start_matches("www.").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Closed enumeration of known platforms plus `Generic`.
///
/// Each concrete type maps to at most one registered handler; `Generic`
/// always resolves to the generic extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    Youtube,
    Reddit,
    Tiktok,
    Ecommerce,
    Twitter,
    Pinterest,
    Facebook,
    Generic,
}

impl SiteType {
    /// Short identifier used in `source` tags and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::Youtube => "youtube",
            SiteType::Reddit => "reddit",
            SiteType::Tiktok => "tiktok",
            SiteType::Ecommerce => "ecommerce",
            SiteType::Twitter => "twitter",
            SiteType::Pinterest => "pinterest",
            SiteType::Facebook => "facebook",
            SiteType::Generic => "generic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_strips_www() {
        assert_eq!(domain_of("https://www.example.com/page"), "example.com");
        assert_eq!(domain_of("https://sub.example.com"), "sub.example.com");
    }

    #[test]
    fn test_domain_unknown_on_parse_failure() {
        assert_eq!(domain_of("not a url"), "unknown");
        assert_eq!(domain_of(""), "unknown");
    }

    #[test]
    fn test_gallery_invariant() {
        let result = MetadataResult::empty("https://example.com", "generic")
            .with_images(vec!["https://a/1.jpg".into(), "https://a/2.jpg".into()]);
        assert_eq!(result.image.as_deref(), Some("https://a/1.jpg"));
        let images = result.images.unwrap();
        assert_eq!(images[0], "https://a/1.jpg");
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn test_single_image_has_no_gallery() {
        let result = MetadataResult::empty("https://example.com", "generic")
            .with_images(vec!["https://a/1.jpg".into()]);
        assert_eq!(result.image.as_deref(), Some("https://a/1.jpg"));
        assert!(result.images.is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let result = MetadataResult::empty("https://example.com", "generic");
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("shouldPersistImage").is_some());
        assert_eq!(json.get("domain").unwrap(), "example.com");
    }
}
