//! Bucketeer sink endpoint

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppContext;

#[derive(Debug, Deserialize)]
pub struct AddContentRequest {
    pub content: String,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn add_content(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<AddContentRequest>,
) -> ApiResult<Json<Value>> {
    let stored = ctx.bucketeer.add_content(&request.content).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Content successfully added to Bucketeer",
        "content_id": stored.id,
        "buckets": stored.buckets,
    })))
}
