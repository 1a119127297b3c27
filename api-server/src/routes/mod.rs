//! REST facade routes
//!
//! Endpoints:
//!   GET  /                                       index
//!   GET  /health                                 health check
//!   GET  /polymarket/search                      keyword search
//!   GET  /polymarket/event/{slug}                single event
//!   GET  /polymarket/tags                        tag listing
//!   GET  /polymarket/price-history/{slug}        one market's history
//!   GET  /polymarket/price-history-all/{slug}    all markets' history
//!   POST /twitter/analyze                        COT analysis
//!   GET  /twitter/post                           single post
//!   POST /youtube/transcript                     video transcript
//!   POST /reddit/analyze                         subreddit posts
//!   POST /notebooklm/add-source                  classified routing
//!   GET  /notebooklm/notebooks                   notebook registry
//!   GET  /notebooklm/config                      sink status
//!   POST /bucketeer/add-content                  bucket storage
//!   POST /agents/create                          scheduled agents CRUD
//!   GET  /agents
//!   GET  /agents/{agent_id}
//!   PUT  /agents/{agent_id}
//!   DELETE /agents/{agent_id}
//!   POST /agents/{agent_id}/run                  manual trigger

pub mod agents;
pub mod bucketeer;
pub mod health;
pub mod notebook;
pub mod polymarket;
pub mod reddit;
pub mod twitter;
pub mod youtube;

use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tracing::warn;

use crate::state::AppContext;

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let cors = cors_layer(&ctx.config.server.cors_origins);

    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health))
        // Polymarket
        .route("/polymarket/search", get(polymarket::search))
        .route("/polymarket/event/{slug}", get(polymarket::event))
        .route("/polymarket/tags", get(polymarket::tags))
        .route(
            "/polymarket/price-history/{slug}",
            get(polymarket::price_history),
        )
        .route(
            "/polymarket/price-history-all/{slug}",
            get(polymarket::price_history_all),
        )
        // Twitter/X
        .route("/twitter/analyze", post(twitter::analyze))
        .route("/twitter/analyze/", post(twitter::analyze))
        .route("/twitter/post", get(twitter::post))
        // YouTube
        .route("/youtube/transcript", post(youtube::transcript))
        // Reddit
        .route("/reddit/analyze", post(reddit::analyze))
        // Notebook sink
        .route("/notebooklm/add-source", post(notebook::add_source))
        .route("/notebooklm/notebooks", get(notebook::notebooks))
        .route("/notebooklm/config", get(notebook::config))
        // Bucketeer sink
        .route("/bucketeer/add-content", post(bucketeer::add_content))
        // Scheduled agents
        .route("/agents/create", post(agents::create))
        .route("/agents", get(agents::list))
        .route("/agents/{agent_id}", get(agents::get_one))
        .route("/agents/{agent_id}", put(agents::update))
        .route("/agents/{agent_id}", delete(agents::remove))
        .route("/agents/{agent_id}/run", post(agents::run_now))
        .layer(cors)
        .with_state(ctx)
}

/// Credentials are allowed, so origins must be an explicit list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Skipping invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = common::AppConfig::default();
        config.agents.store_path = dir
            .path()
            .join("agents.json")
            .to_string_lossy()
            .into_owned();
        let router = build_router(AppContext::new(config));
        (dir, router)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(path: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_dir, router) = test_router();

        let response = router.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "sourcer-api");
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let (_dir, router) = test_router();

        let response = router.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["name"], "Sourcer API");
        assert!(body["endpoints"].is_object());
    }

    #[tokio::test]
    async fn test_agents_crud_flow() {
        let (_dir, router) = test_router();

        // create
        let response = router
            .clone()
            .oneshot(post_json(
                "/agents/create",
                json!({
                    "name": "WSB daily",
                    "source_type": "reddit",
                    "query_params": {"subreddit": "wallstreetbets", "post_count": 10},
                    "schedule": "daily",
                    "schedule_time": "07:30"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        assert_eq!(created["success"], true);
        let agent_id = created["agent_id"].as_str().unwrap().to_string();
        assert!(created["next_run"].is_string());

        // list
        let response = router.clone().oneshot(get("/agents")).await.unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed["agents"].as_array().unwrap().len(), 1);

        // get one
        let response = router
            .clone()
            .oneshot(get(&format!("/agents/{agent_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["name"], "WSB daily");
        assert_eq!(fetched["status"], "active");

        // pause via update
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/agents/{agent_id}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"status": "paused"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["agent"]["status"], "paused");

        // delete
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/agents/{agent_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // gone
        let response = router
            .oneshot(get(&format!("/agents/{agent_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_agent_rejects_bad_schedule() {
        let (_dir, router) = test_router();

        let response = router
            .oneshot(post_json(
                "/agents/create",
                json!({
                    "name": "broken",
                    "source_type": "polymarket",
                    "query_params": {"keyword": "fed"},
                    "schedule": "daily",
                    "schedule_time": "25:99"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("25:99"));
    }

    #[tokio::test]
    async fn test_run_unknown_agent_is_404() {
        let (_dir, router) = test_router();

        let response = router
            .oneshot(post_json(
                &format!("/agents/{}/run", uuid::Uuid::new_v4()),
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Agent not found");
    }
}
