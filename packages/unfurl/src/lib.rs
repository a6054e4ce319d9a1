//! Link Unfurling Library
//!
//! Turns an arbitrary URL into bookmark-preview metadata: title,
//! description, images, favicon, and a flag saying whether the preview
//! image should be copied into durable storage before it expires.
//!
//! # Design
//!
//! - Every inbound URL passes the SSRF guard before any network I/O
//! - A detector maps hosts to site types; a registry dispatches each
//!   type to its handler
//! - Handlers try structured APIs first (oEmbed, JSON endpoints) and
//!   degrade through HTML scraping down to a synthesized stub, so
//!   extraction itself never errors out of the dispatch path
//! - Image persistence runs on a concurrency-bounded in-process queue
//!
//! # Modules
//!
//! - [`guard`] - SSRF validation for inbound URLs
//! - [`detector`] - Host-pattern site classification
//! - [`registry`] - Handler dispatch with generic fallback
//! - [`generic`] - OG / Twitter / JSON-LD extraction for any page
//! - [`handlers`] - Platform-specific extraction tiers
//! - [`persist`] - Expiring-image detection and the persistence queue
//! - [`article`] - Full-article content extraction
//! - [`link_check`] - Liveness probing for saved links
//! - [`embeds`] - Single-purpose platform lookups (tweets, pins, ...)

pub mod article;
pub mod client;
pub mod config;
pub mod detector;
pub mod embeds;
pub mod error;
pub mod generic;
pub mod guard;
pub mod handlers;
pub mod link_check;
pub mod persist;
pub mod registry;
pub mod scrape;
pub mod types;

// Re-export core types at crate root
pub use article::{Article, ArticleExtractor};
pub use config::UnfurlConfig;
pub use embeds::EmbedClient;
pub use error::{FetchError, PersistError, SecurityError};
pub use generic::GenericExtractor;
pub use guard::UrlGuard;
pub use link_check::{LinkCheckResult, LinkChecker, LinkStatus};
pub use persist::{needs_persistence, DurableStore, HttpDurableStore, ImageQueue, QueueStatus};
pub use registry::{MetadataHandler, Registry};
pub use types::{MetadataResult, SiteType};
