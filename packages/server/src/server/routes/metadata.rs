use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::server::app::AppState;
use crate::server::routes::error_body;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub url: String,
    /// Entity to attach a persisted preview image to, when the caller
    /// wants re-hosting
    #[serde(default)]
    pub subject_id: Option<String>,
}

/// Extract preview metadata for a URL.
///
/// The only failure mode is URL screening; extraction itself degrades to
/// an empty-but-well-formed result.
pub async fn metadata_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<MetadataRequest>,
) -> Response {
    match state.registry.dispatch(&request.url).await {
        Ok(result) => {
            if result.should_persist_image {
                if let (Some(subject_id), Some(image)) =
                    (request.subject_id.as_deref(), result.image.as_deref())
                {
                    if state.queue.clone().enqueue(subject_id, image) {
                        info!(subject_id, "preview image queued for persistence");
                    }
                }
            }
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, error_body(e.to_string())).into_response(),
    }
}
