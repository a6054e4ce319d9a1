//! End-to-end dispatch tests against a local fixture server.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unfurl::error::FetchError;
use unfurl::registry::MetadataHandler;
use unfurl::types::SiteType;
use unfurl::{MetadataResult, Registry, UnfurlConfig, UrlGuard};

fn client() -> reqwest::Client {
    unfurl::client::build_client()
}

fn local_guard() -> UrlGuard {
    UrlGuard::new().allow_host("127.0.0.1").allow_host("localhost")
}

#[tokio::test]
async fn guard_rejects_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // Default guard: loopback is blocked, so the fixture server must
    // never see a request.
    let registry = Registry::new(client(), UnfurlConfig::default(), UrlGuard::new());
    let result = registry.dispatch(&format!("{}/page", server.uri())).await;
    assert!(result.is_err());

    server.verify().await;
}

#[tokio::test]
async fn generic_extraction_validates_image_candidates() {
    let server = MockServer::start().await;
    let page = format!(
        r#"<html><head>
            <title>Fallback</title>
            <meta property="og:title" content="Demo Page">
            <meta property="og:description" content="A page for testing">
            <meta property="og:image" content="{0}/img/bad.jpg">
            <meta property="og:image" content="{0}/img/ok.jpg">
            <link rel="icon" href="/favicon.ico">
        </head><body></body></html>"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;
    // First candidate is not an image and must be dropped.
    Mock::given(method("HEAD"))
        .and(path("/img/bad.jpg"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/img/ok.jpg"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
        .mount(&server)
        .await;

    let registry = Registry::new(client(), UnfurlConfig::default(), local_guard());
    let result = registry
        .dispatch(&format!("{}/page", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.title.as_deref(), Some("Demo Page"));
    assert_eq!(result.description.as_deref(), Some("A page for testing"));
    assert_eq!(
        result.image.as_deref(),
        Some(format!("{}/img/ok.jpg", server.uri()).as_str())
    );
    assert!(result.images.is_none());
    assert_eq!(
        result.favicon.as_deref(),
        Some(format!("{}/favicon.ico", server.uri()).as_str())
    );
    assert_eq!(result.source, "generic");
}

#[tokio::test]
async fn unreachable_page_yields_domain_only_shell() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = Registry::new(client(), UnfurlConfig::default(), local_guard());
    let result = registry
        .dispatch(&format!("{}/down", server.uri()))
        .await
        .unwrap();

    // The fetch failed outright, but the result is still well-formed.
    assert_eq!(result.source, "generic");
    assert_eq!(result.domain, "127.0.0.1");
    assert!(result.title.is_none());
    assert!(result.description.is_none());
    assert!(result.image.is_none());
    assert!(result.images.is_none());
    assert!(!result.should_persist_image);
}

struct FailingHandler;

#[async_trait]
impl MetadataHandler for FailingHandler {
    async fn extract(&self, url: &Url) -> Result<MetadataResult, FetchError> {
        Err(FetchError::Status {
            status: 503,
            url: url.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn failed_handler_falls_back_to_generic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta property="og:title" content="Recovered"></head></html>"#,
        ))
        .mount(&server)
        .await;

    // Loopback URLs classify as Generic, so installing the failing
    // handler there exercises the fallback path without real network.
    let mut handlers: HashMap<SiteType, Arc<dyn MetadataHandler>> = HashMap::new();
    handlers.insert(SiteType::Generic, Arc::new(FailingHandler));
    let registry =
        Registry::with_handlers(client(), UnfurlConfig::default(), local_guard(), handlers);

    let result = registry
        .dispatch(&format!("{}/post", server.uri()))
        .await
        .unwrap();
    assert_eq!(result.title.as_deref(), Some("Recovered"));
    assert_eq!(result.source, "generic");
}

#[tokio::test]
async fn reddit_falls_through_to_json_tier() {
    let server = MockServer::start().await;
    // No /oembed mock: tier 1 gets a 404 and misses.
    Mock::given(method("GET"))
        .and(path("/r/rust/comments/abc/title.json"))
        .and(query_param("raw_json", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "data": {
                    "children": [
                        {
                            "data": {
                                "title": "A rust post",
                                "selftext": "Body text",
                                "preview": {
                                    "images": [
                                        {"source": {"url": "https://preview.redd.it/x.jpg?x-expires=1"}}
                                    ]
                                }
                            }
                        }
                    ]
                }
            }
        ])))
        .mount(&server)
        .await;

    let mut config = UnfurlConfig::default();
    config.reddit_base = server.uri();
    let handler = unfurl::handlers::reddit::RedditHandler::new(client(), config);

    let url = Url::parse("https://www.reddit.com/r/rust/comments/abc/title").unwrap();
    let result = handler.extract(&url).await.unwrap();

    assert_eq!(result.source, "reddit-json");
    assert_eq!(result.title.as_deref(), Some("A rust post"));
    assert_eq!(
        result.image.as_deref(),
        Some("https://preview.redd.it/x.jpg?x-expires=1")
    );
    assert!(result.should_persist_image);
}

#[tokio::test]
async fn youtube_without_oembed_synthesizes_title() {
    // oEmbed and every thumbnail probe 404; the handler still produces a
    // titled result with the guaranteed-to-exist thumbnail URL.
    let server = MockServer::start().await;

    let mut config = UnfurlConfig::default();
    config.youtube_oembed_base = format!("{}/oembed", server.uri());
    config.youtube_thumb_base = format!("{}/vi", server.uri());
    let handler = unfurl::handlers::youtube::YoutubeHandler::new(client(), config);

    let url = Url::parse("https://www.youtube.com/watch?v=abc123").unwrap();
    let result = handler.extract(&url).await.unwrap();

    assert_eq!(result.title.as_deref(), Some("Video - abc123"));
    assert_eq!(result.source, "youtube-scrape");
    assert_eq!(
        result.image.as_deref(),
        Some(format!("{}/vi/abc123/hqdefault.jpg", server.uri()).as_str())
    );
    assert!(!result.should_persist_image);
}

#[tokio::test]
async fn tiktok_oembed_target_url_is_encoded() {
    let server = MockServer::start().await;
    // The target carries its own query string; the oEmbed lookup only
    // matches if the whole thing arrives as a single `url` parameter.
    let target = "https://www.tiktok.com/@user/video/7123456789012345678?lang=en&is_copy=1";
    Mock::given(method("GET"))
        .and(path("/oembed"))
        .and(query_param("url", target))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title": "A clip",
            "author_name": "someone",
            "thumbnail_url": "https://p16-sign.tiktokcdn.com/thumb.jpeg?x-expires=1"
        })))
        .mount(&server)
        .await;

    let mut config = UnfurlConfig::default();
    config.tiktok_oembed_base = format!("{}/oembed", server.uri());
    let handler = unfurl::handlers::tiktok::TiktokHandler::new(client(), config);

    let url = Url::parse(target).unwrap();
    let result = handler.extract(&url).await.unwrap();

    assert_eq!(result.source, "tiktok-oembed");
    assert_eq!(result.title.as_deref(), Some("A clip"));
}

#[tokio::test]
async fn reddit_exhausted_tiers_yield_stub() {
    // Every endpoint 404s, so all three tiers miss.
    let server = MockServer::start().await;

    let mut config = UnfurlConfig::default();
    config.reddit_base = server.uri();
    let handler = unfurl::handlers::reddit::RedditHandler::new(client(), config);

    let url = Url::parse("https://www.reddit.com/r/rust/comments/gone/removed").unwrap();
    let result = handler.extract(&url).await.unwrap();

    assert_eq!(result.source, "reddit-fallback");
    assert_eq!(result.title.as_deref(), Some("Reddit Post"));
    assert!(result.image.is_none());
    assert!(result.favicon.is_some());
    assert!(!result.should_persist_image);
}
