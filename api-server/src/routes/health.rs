//! Index and health endpoints

use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

/// API root: what lives where
pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "Sourcer API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/polymarket/search": "Search Polymarket events by keyword",
            "/polymarket/event/{slug}": "Get specific event by slug",
            "/polymarket/tags": "List all available tags",
            "/twitter/analyze": "Analyze Twitter accounts (POST)",
            "/twitter/post": "Get single post content",
            "/youtube/transcript": "Get video transcript (POST)",
            "/reddit/analyze": "Fetch subreddit posts (POST)",
            "/agents": "Scheduled agents",
            "/health": "Health check"
        }
    }))
}

/// Health check for deploy platforms and monitoring
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "sourcer-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
