//! Unified API router
//!
//! Merges the module routers into a single axum `Router` with rate limits,
//! CORS and request tracing.
//!
//! ## Endpoint Map
//!
//! | Route                 | Module   | Limits        | Description                  |
//! |-----------------------|----------|---------------|------------------------------|
//! | `GET /health`         | api      | none          | Liveness probe               |
//! | `GET /`               | api      | default       | HTML home with latest previews |
//! | `GET /content/list`   | store    | default       | Latest filenames             |
//! | `GET /content/:name`  | store    | default       | Raw artifact text            |
//! | `GET|POST /generate`  | pipeline | generate      | Run one cycle now            |

use crate::config::{RateLimitConfig, ScribeConfig};
use crate::error::Result;
use crate::limiter::{rate_limit, RateLimiter};
use crate::pipeline::{generate_router, GenerateState, Pipeline};
use crate::store::{content_router, ArtifactStore, ContentState};
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use minijinja::{context, Environment};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const INDEX_TEMPLATE: &str = "index.html";

/// State for the home page
#[derive(Clone)]
pub struct HomeState {
    pub store: Arc<ArtifactStore>,
    pub templates: Arc<Environment<'static>>,
    /// Number of previews on the home page
    pub home_count: usize,
}

/// Compile the built-in HTML templates. `.html` names are auto-escaped.
pub fn templates() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template(INDEX_TEMPLATE, include_str!("templates/index.html"))?;
    Ok(env)
}

/// Build the complete HTTP application
pub fn build_app(pipeline: Arc<Pipeline>, config: &ScribeConfig) -> Result<Router> {
    let store = pipeline.store().clone();
    let (default_limiter, generate_limiter) = build_limiters(&config.rate_limit);

    let home = HomeState {
        store: store.clone(),
        templates: Arc::new(templates()?),
        home_count: config.content.home_count,
    };
    let content = ContentState {
        store,
        list_count: config.content.list_count,
    };

    // One limiter instance for all default routes, so their budgets are shared.
    let default_routes = with_limits(
        Router::new()
            .route("/", get(home_page))
            .with_state(home)
            .merge(content_router(content)),
        default_limiter,
    );
    let generate_routes = with_limits(
        generate_router(GenerateState { pipeline }),
        generate_limiter,
    );

    Ok(Router::new()
        .route("/health", get(health_check))
        .merge(default_routes)
        .merge(generate_routes)
        .layer(build_cors(&config.server.cors_origins))
        .layer(TraceLayer::new_for_http()))
}

fn build_limiters(
    config: &RateLimitConfig,
) -> (Option<Arc<RateLimiter>>, Option<Arc<RateLimiter>>) {
    if !config.enabled {
        return (None, None);
    }
    (
        Some(Arc::new(RateLimiter::new(config.default_limits.clone()))),
        Some(Arc::new(RateLimiter::new(config.generate_limits.clone()))),
    )
}

fn with_limits(router: Router, limiter: Option<Arc<RateLimiter>>) -> Router {
    match limiter {
        Some(limiter) => router.layer(middleware::from_fn_with_state(limiter, rate_limit)),
        None => router,
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /
async fn home_page(State(state): State<HomeState>) -> Response {
    let latest = state.store.latest_previews(state.home_count).await;
    let rendered = state
        .templates
        .get_template(INDEX_TEMPLATE)
        .and_then(|t| t.render(context! { latest_content => latest }));

    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Home page render failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"status": "error", "message": e.to_string()})),
            )
                .into_response()
        }
    }
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitRule;
    use crate::generation::test_support::CannedBackend;
    use crate::pipeline::test_support::{pipeline, single_pools};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn make_app(config: &ScribeConfig) -> (Router, Arc<Pipeline>, TempDir) {
        let dir = TempDir::new().unwrap();
        let pipeline = Arc::new(pipeline(
            dir.path(),
            CannedBackend::failing(),
            single_pools("science", "blog post"),
        ));
        let app = build_app(pipeline.clone(), config).unwrap();
        (app, pipeline, dir)
    }

    async fn send(app: &Router, method: &str, uri: &str) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let resp = health_check().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_templates_compile() {
        let env = templates().unwrap();
        assert!(env.get_template(INDEX_TEMPLATE).is_ok());
    }

    #[test]
    fn test_build_cors_empty_origins() {
        let _cors = build_cors(&[]);
    }

    #[test]
    fn test_build_cors_with_origins() {
        let _cors = build_cors(&["http://localhost:5000".to_string()]);
    }

    #[tokio::test]
    async fn test_home_empty() {
        let (app, _pipeline, _dir) = make_app(&ScribeConfig::default());
        let resp = send(&app, "GET", "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("No content yet."));
    }

    #[tokio::test]
    async fn test_home_shows_latest_escaped() {
        let (app, pipeline, _dir) = make_app(&ScribeConfig::default());
        let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        pipeline
            .store()
            .save_at("Title: <b>Bold</b> Claims\n\nBody text here.", "science", at)
            .await
            .unwrap();

        let html = body_text(send(&app, "GET", "/").await).await;
        assert!(html.contains("Generated: 2024-05-01_09-00-00"));
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>Bold</b>"));
        assert!(html.contains("2024-05-01_09-00-00_science.txt"));
    }

    #[tokio::test]
    async fn test_generate_then_list_and_fetch() {
        let (app, _pipeline, _dir) = make_app(&ScribeConfig::default());

        let resp = send(&app, "POST", "/generate").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        let filename = json["filename"].as_str().unwrap().to_string();

        let list: serde_json::Value =
            serde_json::from_str(&body_text(send(&app, "GET", "/content/list").await).await)
                .unwrap();
        assert_eq!(list["files"][0], filename.as_str());

        let text = body_text(send(&app, "GET", &format!("/content/{}", filename)).await).await;
        assert!(text.contains("Topic: science"));
    }

    #[tokio::test]
    async fn test_generate_rate_limited() {
        let mut config = ScribeConfig::default();
        config.rate_limit.generate_limits = vec![LimitRule::new(1, 60)];
        let (app, _pipeline, _dir) = make_app(&config);

        assert_eq!(send(&app, "GET", "/generate").await.status(), StatusCode::OK);
        assert_eq!(
            send(&app, "GET", "/generate").await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        // Other routes draw from a separate budget.
        assert_eq!(send(&app, "GET", "/content/list").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_default_routes_share_budget_and_health_is_exempt() {
        let mut config = ScribeConfig::default();
        config.rate_limit.default_limits = vec![LimitRule::new(2, 3600)];
        let (app, _pipeline, _dir) = make_app(&config);

        assert_eq!(send(&app, "GET", "/").await.status(), StatusCode::OK);
        assert_eq!(send(&app, "GET", "/content/list").await.status(), StatusCode::OK);
        assert_eq!(
            send(&app, "GET", "/content/list").await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(send(&app, "GET", "/health").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_disabled() {
        let mut config = ScribeConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.default_limits = vec![LimitRule::new(1, 3600)];
        let (app, _pipeline, _dir) = make_app(&config);

        for _ in 0..3 {
            assert_eq!(send(&app, "GET", "/content/list").await.status(), StatusCode::OK);
        }
    }
}
