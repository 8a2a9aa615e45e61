//! HTTP handlers for stored content
//!
//! - GET /content/list       — latest filenames, newest first
//! - GET /content/:filename  — raw artifact text

use super::ArtifactStore;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

/// Shared state for content handlers
#[derive(Clone)]
pub struct ContentState {
    pub store: Arc<ArtifactStore>,
    /// Number of filenames returned by the listing endpoint
    pub list_count: usize,
}

/// Create the content router
pub fn content_router(state: ContentState) -> Router {
    Router::new()
        .route("/content/list", get(list_content))
        .route("/content/:filename", get(get_content))
        .with_state(state)
}

/// GET /content/list
async fn list_content(State(state): State<ContentState>) -> impl IntoResponse {
    let files = state.store.list_latest(state.list_count).await;
    Json(serde_json::json!({
        "status": "success",
        "count": files.len(),
        "files": files,
    }))
}

/// GET /content/:filename
async fn get_content(
    State(state): State<ContentState>,
    Path(filename): Path<String>,
) -> Response {
    match state.store.fetch(&filename).await {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(file = %filename, error = %e, "Content retrieval error");
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"status": "error", "message": e.to_string()})),
            )
                .into_response()
        }
    }
}
