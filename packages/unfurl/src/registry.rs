//! Handler trait and dispatch registry.
//!
//! Dispatch never lets a handler error escape: a missing or failing
//! handler falls through to the generic extractor, so every
//! guard-passing URL yields a well-formed result.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::config::UnfurlConfig;
use crate::detector::detect;
use crate::error::{FetchResult, SecurityError};
use crate::generic::GenericExtractor;
use crate::guard::UrlGuard;
use crate::handlers;
use crate::types::{MetadataResult, SiteType};

/// A per-platform extraction strategy with internal fallback tiers.
///
/// Implementations return `Err` only for wholesale failure of every
/// internal tier that has no stub recovery; the registry converts that
/// into a generic-extractor pass.
#[async_trait]
pub trait MetadataHandler: Send + Sync {
    async fn extract(&self, url: &Url) -> FetchResult<MetadataResult>;

    /// Handler identifier for logs.
    fn name(&self) -> &'static str;
}

/// Site-type → handler table plus the universal fallback.
pub struct Registry {
    guard: UrlGuard,
    generic: GenericExtractor,
    handlers: HashMap<SiteType, Arc<dyn MetadataHandler>>,
}

impl Registry {
    /// Build the production registry with all platform handlers.
    pub fn new(client: reqwest::Client, config: UnfurlConfig, guard: UrlGuard) -> Self {
        let mut handlers: HashMap<SiteType, Arc<dyn MetadataHandler>> = HashMap::new();
        handlers.insert(
            SiteType::Youtube,
            Arc::new(handlers::youtube::YoutubeHandler::new(
                client.clone(),
                config.clone(),
            )),
        );
        handlers.insert(
            SiteType::Reddit,
            Arc::new(handlers::reddit::RedditHandler::new(
                client.clone(),
                config.clone(),
            )),
        );
        handlers.insert(
            SiteType::Tiktok,
            Arc::new(handlers::tiktok::TiktokHandler::new(
                client.clone(),
                config.clone(),
            )),
        );
        handlers.insert(
            SiteType::Ecommerce,
            Arc::new(handlers::ecommerce::EcommerceHandler::new(
                client.clone(),
                config.clone(),
            )),
        );

        Self {
            guard,
            generic: GenericExtractor::new(client, config),
            handlers,
        }
    }

    /// Build a registry with an explicit handler table (tests).
    pub fn with_handlers(
        client: reqwest::Client,
        config: UnfurlConfig,
        guard: UrlGuard,
        handlers: HashMap<SiteType, Arc<dyn MetadataHandler>>,
    ) -> Self {
        Self {
            guard,
            generic: GenericExtractor::new(client, config),
            handlers,
        }
    }

    /// Validate, detect, and run the matched handler.
    ///
    /// The only error case is the URL guard rejecting the input; past
    /// that point every failure path terminates in a well-formed result.
    pub async fn dispatch(&self, raw: &str) -> Result<MetadataResult, SecurityError> {
        let url = self.guard.validate(raw)?;
        let site = detect(&url);
        debug!(url = %url, site = site.as_str(), "dispatching");

        let Some(handler) = self.handlers.get(&site) else {
            return Ok(self.generic.extract(&url).await);
        };

        match handler.extract(&url).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(
                    url = %url,
                    handler = handler.name(),
                    error = %e,
                    "handler failed, falling back to generic extractor"
                );
                Ok(self.generic.extract(&url).await)
            }
        }
    }

    /// The guard, for callers that validate before other operations.
    pub fn guard(&self) -> &UrlGuard {
        &self.guard
    }
}
