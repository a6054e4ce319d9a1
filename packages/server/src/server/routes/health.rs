use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use unfurl::QueueStatus;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    queue: QueueStatus,
    timestamp: String,
}

/// Health check endpoint
///
/// Reports the persistence queue's depth alongside liveness; a queue that
/// never drains shows up here before it shows up as missing images.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            queue: state.queue.status(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}
