pub mod article;
pub mod embeds;
pub mod health;
pub mod links;
pub mod metadata;

pub use article::article_handler;
pub use embeds::{
    facebook_handler, pinterest_handler, reddit_handler, tiktok_handler, tweet_handler,
};
pub use health::health_handler;
pub use links::link_check_handler;
pub use metadata::metadata_handler;

use axum::Json;
use serde_json::{json, Value};

/// Uniform error payload for the JSON API.
pub(crate) fn error_body(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "error": message.into() }))
}
