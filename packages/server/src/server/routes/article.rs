use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::server::app::AppState;
use crate::server::routes::error_body;

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub url: String,
}

/// Extract full article content for a reader view.
pub async fn article_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<ArticleRequest>,
) -> Response {
    let url = match state.registry.guard().validate(&request.url) {
        Ok(url) => url,
        Err(e) => return (StatusCode::BAD_REQUEST, error_body(e.to_string())).into_response(),
    };

    match state.article.extract(&url).await {
        Ok(article) => (
            StatusCode::OK,
            Json(json!({ "success": true, "article": article })),
        )
            .into_response(),
        Err(e) => {
            warn!(url = %url, error = %e, "article extraction failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
