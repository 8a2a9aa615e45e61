//! HTTP handler for on-demand generation
//!
//! - GET|POST /generate — run one cycle synchronously

use super::Pipeline;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Shared state for the generate handler
#[derive(Clone)]
pub struct GenerateState {
    pub pipeline: Arc<Pipeline>,
}

/// Response body of a generation request
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub status: &'static str,
    pub topic: String,
    pub style: String,
    pub title: String,
    pub content: String,
    pub filename: Option<String>,
    pub timestamp: String,
    pub source: String,
}

/// Create the generate router
pub fn generate_router(state: GenerateState) -> Router {
    Router::new()
        .route("/generate", get(generate_now).post(generate_now))
        .with_state(state)
}

/// GET|POST /generate
async fn generate_now(State(state): State<GenerateState>) -> impl IntoResponse {
    match state.pipeline.run_cycle().await {
        Ok(outcome) => {
            let filename = outcome.filename();
            let response = GenerateResponse {
                status: if filename.is_some() {
                    "success"
                } else {
                    "partial_success"
                },
                topic: outcome.topic,
                style: outcome.style,
                title: outcome.artifact.title,
                content: outcome.artifact.body,
                filename,
                timestamp: outcome.completed_at.to_rfc3339(),
                source: outcome.artifact.provenance.to_string(),
            };
            (StatusCode::OK, Json(serde_json::json!(response)))
        }
        Err(e) => {
            tracing::error!(error = %e, "Generation endpoint error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"status": "error", "message": e.to_string()})),
            )
        }
    }
}
