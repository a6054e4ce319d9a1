//! Dedicated platform lookup routes backed by [`unfurl::EmbedClient`].
//!
//! Successful lookups come back as `{data: ...}` envelopes.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use unfurl::error::FetchError;

use crate::server::app::AppState;
use crate::server::routes::error_body;

#[derive(Debug, Deserialize)]
pub struct TweetQuery {
    pub id: String,
}

/// Tweet JSON by numeric id.
pub async fn tweet_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<TweetQuery>,
) -> Response {
    match state.embeds.tweet(&query.id).await {
        Ok(body) => (StatusCode::OK, Json(json!({ "data": body }))).into_response(),
        Err(FetchError::InvalidUrl { .. }) => (
            StatusCode::BAD_REQUEST,
            error_body("id must be a 5-40 digit tweet id"),
        )
            .into_response(),
        Err(e) => {
            warn!(id = %query.id, error = %e, "tweet lookup failed");
            (StatusCode::NOT_FOUND, error_body("tweet not found")).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RedditQuery {
    pub id: Option<String>,
    pub url: Option<String>,
}

/// Reddit post JSON by id or URL. Lookup failures with a usable URL
/// degrade to an object built from the URL itself.
pub async fn reddit_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<RedditQuery>,
) -> Response {
    if query.id.is_none() && query.url.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            error_body("either id or url is required"),
        )
            .into_response();
    }

    match state
        .embeds
        .reddit_post(query.id.as_deref(), query.url.as_deref())
        .await
    {
        Some(body) => (StatusCode::OK, Json(json!({ "data": body }))).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            error_body("url could not be parsed"),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

/// TikTok oEmbed data; always answers, synthesizing a fallback object
/// when the oEmbed endpoint does not.
pub async fn tiktok_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<UrlQuery>,
) -> Response {
    if let Err(e) = state.registry.guard().validate(&query.url) {
        return (StatusCode::BAD_REQUEST, error_body(e.to_string())).into_response();
    }
    let body = state.embeds.tiktok(&query.url).await;
    (StatusCode::OK, Json(json!({ "data": body }))).into_response()
}

/// Resolve a pin link (short links included) to its canonical URL and id.
pub async fn pinterest_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<UrlQuery>,
) -> Response {
    if let Err(e) = state.registry.guard().validate(&query.url) {
        return (StatusCode::BAD_REQUEST, error_body(e.to_string())).into_response();
    }
    match state.embeds.resolve_pin(&query.url).await {
        Ok((url, id)) => (
            StatusCode::OK,
            Json(json!({ "data": { "url": url, "id": id } })),
        )
            .into_response(),
        Err(e) => {
            warn!(url = %query.url, error = %e, "pin resolution failed");
            (StatusCode::BAD_GATEWAY, error_body(e.to_string())).into_response()
        }
    }
}

/// Canonicalize a share link by following its redirects.
pub async fn facebook_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<UrlQuery>,
) -> Response {
    if let Err(e) = state.registry.guard().validate(&query.url) {
        return (StatusCode::BAD_REQUEST, error_body(e.to_string())).into_response();
    }
    match state.embeds.resolve_redirect(&query.url).await {
        Ok(url) => (StatusCode::OK, Json(json!({ "data": { "url": url } }))).into_response(),
        Err(e) => {
            warn!(url = %query.url, error = %e, "share link resolution failed");
            (StatusCode::BAD_GATEWAY, error_body(e.to_string())).into_response()
        }
    }
}
