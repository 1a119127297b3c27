//! Reddit endpoint

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppContext;
use source_adapters::reddit::RedditAnalysis;

#[derive(Debug, Deserialize)]
pub struct RedditAnalysisRequest {
    pub subreddit: String,
    #[serde(default = "default_post_count")]
    pub post_count: u32,
}

fn default_post_count() -> u32 {
    10
}

pub async fn analyze(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<RedditAnalysisRequest>,
) -> ApiResult<Json<RedditAnalysis>> {
    let analysis = ctx
        .reddit
        .fetch_subreddit(&request.subreddit, request.post_count)
        .await?;
    Ok(Json(analysis))
}
