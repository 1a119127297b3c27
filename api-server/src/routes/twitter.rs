//! Twitter/X endpoints

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppContext;
use source_adapters::twitter::{TwitterAnalysis, TwitterAnalysisRequest, XPost};

pub async fn analyze(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<TwitterAnalysisRequest>,
) -> ApiResult<Json<TwitterAnalysis>> {
    Ok(Json(ctx.twitter.analyze(&request).await?))
}

#[derive(Debug, Deserialize)]
pub struct PostParams {
    pub url: String,
}

pub async fn post(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<PostParams>,
) -> ApiResult<Json<XPost>> {
    Ok(Json(ctx.twitter.fetch_post(&params.url).await?))
}
