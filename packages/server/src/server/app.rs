//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use unfurl::{
    ArticleExtractor, EmbedClient, HttpDurableStore, ImageQueue, LinkChecker, Registry,
    UnfurlConfig, UrlGuard,
};

use crate::config::Config;
use crate::server::routes::{
    article_handler, facebook_handler, health_handler, link_check_handler, metadata_handler,
    pinterest_handler, reddit_handler, tiktok_handler, tweet_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub queue: Arc<ImageQueue>,
    pub article: Arc<ArticleExtractor>,
    pub checker: Arc<LinkChecker>,
    pub embeds: Arc<EmbedClient>,
}

/// Build the Axum application router
pub fn build_app(config: &Config) -> Router {
    let client = unfurl::client::build_client();
    let unfurl_config = UnfurlConfig::default();

    let guard = config
        .allowed_hosts
        .iter()
        .fold(UrlGuard::new(), |guard, host| guard.allow_host(host.as_str()));

    let store = Arc::new(HttpDurableStore::new(
        client.clone(),
        config.storage_api_url.clone(),
        config.storage_api_key.clone(),
    ));

    let app_state = AppState {
        registry: Arc::new(Registry::new(
            client.clone(),
            unfurl_config.clone(),
            guard.clone(),
        )),
        queue: Arc::new(ImageQueue::new(
            client.clone(),
            unfurl_config.clone(),
            store,
        )),
        article: Arc::new(ArticleExtractor::new(client.clone(), unfurl_config.clone())),
        checker: Arc::new(LinkChecker::new(unfurl_config.clone(), guard)),
        embeds: Arc::new(EmbedClient::new(client, unfurl_config)),
    };

    // CORS configuration - the API is consumed by browser extensions and
    // web clients from arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    // Rate limiting: 10 requests per second per IP with bursts of 20.
    // Extraction fans out to third-party fetches, so abuse is expensive.
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor) // Extract IP from X-Forwarded-For header
            .finish()
            .expect("Rate limiter configuration is valid and should never fail"),
    );
    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    let api = Router::new()
        .route("/api/metadata", post(metadata_handler))
        .route("/api/article", post(article_handler))
        .route("/api/link-check", post(link_check_handler))
        .route("/api/tweet", get(tweet_handler))
        .route("/api/reddit", get(reddit_handler))
        .route("/api/tiktok", get(tiktok_handler))
        .route("/api/pinterest", get(pinterest_handler))
        .route("/api/facebook", get(facebook_handler))
        .layer(rate_limit_layer);

    api
        // Health check (no rate limit)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors)
        // Whole-request ceiling above the per-fetch deadlines, so a slow
        // upstream cannot pin a connection open indefinitely
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
}
