//! E-commerce handler: JSON-LD product data first, then storefront
//! selector heuristics, then og/twitter meta.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::client::{self, absolutize};
use crate::config::UnfurlConfig;
use crate::error::FetchResult;
use crate::generic;
use crate::persist::needs_persistence;
use crate::registry::MetadataHandler;
use crate::types::{domain_of, MetadataResult};

/// Product-image selectors in priority order: marketplace landing images
/// first, then common storefront gallery classes.
const IMAGE_SELECTORS: &[(&str, &[&str])] = &[
    ("#landingImage", &["data-old-hires", "src"]),
    ("#imgBlkFront", &["data-old-hires", "src"]),
    ("#ebooksImgBlkFront", &["src"]),
    (".a-dynamic-image", &["data-old-hires", "src"]),
    ("#main-image-container img", &["src"]),
    (".imgTagWrapper img", &["src"]),
    (".product__media img", &["src"]),
    (".product-single__photo img", &["src"]),
    (".product-gallery img", &["src"]),
    ("img.product-image", &["src"]),
];

pub struct EcommerceHandler {
    client: reqwest::Client,
    config: UnfurlConfig,
}

impl EcommerceHandler {
    pub fn new(client: reqwest::Client, config: UnfurlConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl MetadataHandler for EcommerceHandler {
    async fn extract(&self, url: &Url) -> FetchResult<MetadataResult> {
        let html =
            client::fetch_text(&self.client, url.as_str(), self.config.page_timeout).await?;

        let storefront = detect_storefront(&html, url);
        let (title, description, images, tier) = {
            let document = Html::parse_document(&html);
            let meta = generic::meta_map(&document);

            let title = meta
                .get("og:title")
                .cloned()
                .or_else(|| product_title(&document))
                .or_else(|| {
                    meta.get("twitter:title")
                        .or_else(|| meta.get("title"))
                        .cloned()
                });
            let description = meta
                .get("og:description")
                .or_else(|| meta.get("description"))
                .or_else(|| meta.get("twitter:description"))
                .cloned();

            // JSON-LD Product images take priority over scraped ones.
            let mut images = generic::jsonld_images(&document, url);
            let tier = if images.is_empty() {
                images = selector_images(&document, url);
                if images.is_empty() {
                    images = generic::og_images(&document, url);
                    if images.is_empty() {
                        if let Some(tw) = meta.get("twitter:image") {
                            if let Some(abs) = absolutize(url, tw) {
                                images.push(abs);
                            }
                        }
                    }
                    "og"
                } else {
                    "selector"
                }
            } else {
                "jsonld"
            };
            debug!(url = %url, tier, images = images.len(), "product image tier selected");

            (title, description, images, tier)
        };

        let mut result =
            MetadataResult::empty(url.as_str(), format!("{storefront}-{tier}")).with_images(images);
        result.title = title;
        result.description = description;
        result.favicon = Some(self.config.favicon_for(&domain_of(url.as_str())));
        result.should_persist_image = result
            .image
            .as_deref()
            .map(|image| needs_persistence(image, &self.config))
            .unwrap_or(false);
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "ecommerce"
    }
}

/// Storefront provenance tag. Extraction is identical either way; only
/// the `source` prefix differs.
fn detect_storefront(html: &str, url: &Url) -> &'static str {
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    if host.contains("amazon.") || host == "a.co" || host == "amzn.to" {
        return "amazon";
    }
    if html.contains("cdn.shopify.com") || html.contains("Shopify.theme") {
        return "shopify";
    }
    "ecommerce"
}

fn product_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("#productTitle, h1.product-title, h1.product__title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Walk the selector heuristics in priority order; all matches of the
/// first selector that yields anything are taken, in document order.
fn selector_images(document: &Html, base: &Url) -> Vec<String> {
    for (selector_str, attrs) in IMAGE_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        let mut images = Vec::new();
        for element in document.select(&selector) {
            let candidate = attrs
                .iter()
                .find_map(|attr| element.value().attr(attr))
                .filter(|v| !v.is_empty());
            if let Some(candidate) = candidate {
                if let Some(abs) = absolutize(base, candidate) {
                    if !images.contains(&abs) {
                        images.push(abs);
                    }
                }
            }
        }
        if !images.is_empty() {
            return images;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.amazon.com/dp/B0ABC").unwrap()
    }

    #[test]
    fn test_selector_priority_prefers_landing_image() {
        let html = r#"
            <img id="landingImage" data-old-hires="https://m.media-amazon.com/full.jpg" src="https://m.media-amazon.com/small.jpg">
            <img class="product-image" src="https://m.media-amazon.com/other.jpg">
        "#;
        let document = Html::parse_document(html);
        let images = selector_images(&document, &base());
        assert_eq!(images, vec!["https://m.media-amazon.com/full.jpg".to_string()]);
    }

    #[test]
    fn test_selector_falls_through_to_gallery_classes() {
        let html = r#"<div class="product__media"><img src="/cdn/shop/p1.png"></div>"#;
        let document = Html::parse_document(html);
        let images = selector_images(&document, &base());
        assert_eq!(
            images,
            vec!["https://www.amazon.com/cdn/shop/p1.png".to_string()]
        );
    }

    #[test]
    fn test_storefront_detection() {
        let amazon = Url::parse("https://www.amazon.co.jp/dp/B1").unwrap();
        assert_eq!(detect_storefront("", &amazon), "amazon");

        let shop = Url::parse("https://shop.example.com/products/x").unwrap();
        assert_eq!(
            detect_storefront(r#"<img src="https://cdn.shopify.com/x.png">"#, &shop),
            "shopify"
        );
        assert_eq!(detect_storefront("<html></html>", &shop), "ecommerce");
    }

    #[test]
    fn test_product_title_text() {
        let html = r#"<span id="productTitle">  Widget Deluxe  </span>"#;
        let document = Html::parse_document(html);
        assert_eq!(product_title(&document).as_deref(), Some("Widget Deluxe"));
    }
}
