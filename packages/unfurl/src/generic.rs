//! Generic OG/Twitter/JSON-LD extractor, the universal fallback.

use std::collections::HashMap;

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::client::{self, absolutize};
use crate::config::UnfurlConfig;
use crate::types::{domain_of, MetadataResult};

/// Universal fallback extractor: raw HTML, `<meta>` map, JSON-LD, image
/// validation via HEAD probes.
pub struct GenericExtractor {
    client: reqwest::Client,
    config: UnfurlConfig,
}

impl GenericExtractor {
    pub fn new(client: reqwest::Client, config: UnfurlConfig) -> Self {
        Self { client, config }
    }

    /// Extract metadata from an arbitrary page.
    ///
    /// Never fails: a page that cannot be fetched yields an all-null
    /// result with the domain populated.
    pub async fn extract(&self, url: &Url) -> MetadataResult {
        let raw = url.as_str();
        let html = match client::fetch_text(&self.client, raw, self.config.page_timeout).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %raw, error = %e, "generic fetch failed");
                return MetadataResult::empty(raw, "generic");
            }
        };

        let (meta, title_tag, candidates, favicon) = {
            // Html is not Send; keep the DOM inside a non-await scope.
            let document = Html::parse_document(&html);
            let meta = meta_map(&document);
            let title_tag = title_text(&document);
            let mut candidates = og_images(&document, url);
            let jsonld = jsonld_images(&document, url);
            for image in jsonld {
                if !candidates.contains(&image) {
                    candidates.push(image);
                }
            }
            if candidates.is_empty() {
                if let Some(tw) = meta.get("twitter:image") {
                    if let Some(abs) = absolutize(url, tw) {
                        candidates.push(abs);
                    }
                }
            }
            let favicon = favicon_link(&document, url);
            (meta, title_tag, candidates, favicon)
        };

        let title = meta
            .get("og:title")
            .or_else(|| meta.get("twitter:title"))
            .cloned()
            .or(title_tag)
            .filter(|t| !t.trim().is_empty());
        let description = meta
            .get("og:description")
            .or_else(|| meta.get("twitter:description"))
            .or_else(|| meta.get("description"))
            .cloned()
            .filter(|d| !d.trim().is_empty());

        let validated = self.validate_images(candidates).await;
        debug!(url = %raw, images = validated.len(), "generic extraction complete");

        let favicon =
            favicon.unwrap_or_else(|| self.config.favicon_for(&domain_of(raw)));

        let mut result = MetadataResult::empty(raw, "generic").with_images(validated);
        result.title = title;
        result.description = description;
        result.favicon = Some(favicon);
        result.should_persist_image = result.image.is_some();
        result
    }

    /// HEAD-probe up to the configured number of candidates, keeping the
    /// ones that look like real, reasonably-sized images. Probe failures
    /// drop the candidate, never the extraction.
    pub async fn validate_images(&self, candidates: Vec<String>) -> Vec<String> {
        let mut validated = Vec::new();
        for candidate in candidates
            .into_iter()
            .take(self.config.max_image_candidates)
        {
            match client::head(&self.client, &candidate, self.config.head_timeout).await {
                Ok(probe) if probe.is_acceptable_image(self.config.max_image_bytes) => {
                    validated.push(candidate);
                }
                Ok(probe) => {
                    debug!(
                        url = %candidate,
                        status = probe.status,
                        content_type = ?probe.content_type,
                        "image candidate rejected"
                    );
                }
                Err(e) => {
                    debug!(url = %candidate, error = %e, "image candidate probe failed");
                }
            }
        }
        validated
    }
}

/// Build a map from every `<meta>` element keyed by `property`, `name`
/// and `itemprop`; first occurrence wins per key.
pub(crate) fn meta_map(document: &Html) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let selector = Selector::parse("meta").expect("static selector");
    for element in document.select(&selector) {
        let Some(content) = element.value().attr("content") else {
            continue;
        };
        for attr in ["property", "name", "itemprop"] {
            if let Some(key) = element.value().attr(attr) {
                map.entry(key.to_ascii_lowercase())
                    .or_insert_with(|| content.to_string());
            }
        }
    }
    map
}

fn title_text(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").expect("static selector");
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Collect `og:image` / `og:image:url` values, deduped by resolved
/// absolute URL, in document order.
pub(crate) fn og_images(document: &Html, base: &Url) -> Vec<String> {
    let selector = Selector::parse("meta").expect("static selector");
    let mut images = Vec::new();
    for element in document.select(&selector) {
        let key = element
            .value()
            .attr("property")
            .or_else(|| element.value().attr("name"))
            .unwrap_or("");
        if !key.eq_ignore_ascii_case("og:image") && !key.eq_ignore_ascii_case("og:image:url") {
            continue;
        }
        let Some(content) = element.value().attr("content") else {
            continue;
        };
        if let Some(abs) = absolutize(base, content) {
            if !images.contains(&abs) {
                images.push(abs);
            }
        }
    }
    images
}

/// Images from JSON-LD blocks typed `Product` or `ItemPage`, including
/// `@graph` arrays.
pub(crate) fn jsonld_images(document: &Html, base: &Url) -> Vec<String> {
    let selector =
        Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector");
    let mut images = Vec::new();
    for element in document.select(&selector) {
        let text: String = element.text().collect();
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        collect_jsonld_images(&value, base, &mut images);
    }
    images
}

fn collect_jsonld_images(value: &Value, base: &Url, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_jsonld_images(item, base, out);
            }
        }
        Value::Object(map) => {
            if let Some(graph) = map.get("@graph") {
                collect_jsonld_images(graph, base, out);
            }
            if is_product_type(map.get("@type")) {
                if let Some(image) = map.get("image") {
                    push_image_value(image, base, out);
                }
            }
        }
        _ => {}
    }
}

fn is_product_type(type_value: Option<&Value>) -> bool {
    match type_value {
        Some(Value::String(s)) => s == "Product" || s == "ItemPage",
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .any(|s| s == "Product" || s == "ItemPage"),
        _ => false,
    }
}

/// JSON-LD `image` can be a string, an array, or an ImageObject.
fn push_image_value(image: &Value, base: &Url, out: &mut Vec<String>) {
    match image {
        Value::String(s) => {
            if let Some(abs) = absolutize(base, s) {
                if !out.contains(&abs) {
                    out.push(abs);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                push_image_value(item, base, out);
            }
        }
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("url").or_else(|| map.get("contentUrl")) {
                if let Some(abs) = absolutize(base, s) {
                    if !out.contains(&abs) {
                        out.push(abs);
                    }
                }
            }
        }
        _ => {}
    }
}

/// First `<link rel*=icon>` resolved against the page URL.
fn favicon_link(document: &Html, base: &Url) -> Option<String> {
    let selector = Selector::parse(r#"link[rel*="icon"]"#).expect("static selector");
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| absolutize(base, href))
}
