use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::server::app::AppState;
use crate::server::routes::error_body;

/// Either a single `url` or a `urls` batch.
#[derive(Debug, Deserialize)]
pub struct LinkCheckRequest {
    pub url: Option<String>,
    pub urls: Option<Vec<String>>,
}

/// Probe saved links for liveness.
///
/// A single URL that fails screening is a 400; in a batch, screened-out
/// entries surface as `error` statuses so the rest of the batch still
/// gets probed. Individual probe failures likewise surface as `error`
/// statuses, never as an HTTP error for the batch.
pub async fn link_check_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<LinkCheckRequest>,
) -> Response {
    match (request.url, request.urls) {
        (Some(url), _) => {
            if let Err(e) = state.registry.guard().validate(&url) {
                return (StatusCode::BAD_REQUEST, error_body(e.to_string())).into_response();
            }
            let result = state.checker.check(&url).await;
            (StatusCode::OK, Json(result)).into_response()
        }
        (None, Some(urls)) => {
            let results = state.checker.check_batch(&urls).await;
            (StatusCode::OK, Json(results)).into_response()
        }
        (None, None) => (
            StatusCode::BAD_REQUEST,
            error_body("either url or urls is required"),
        )
            .into_response(),
    }
}
