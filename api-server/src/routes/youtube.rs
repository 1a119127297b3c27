//! YouTube transcript endpoint

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppContext;
use source_adapters::youtube::Transcript;

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    pub url: String,
}

pub async fn transcript(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<TranscriptRequest>,
) -> ApiResult<Json<Transcript>> {
    Ok(Json(ctx.youtube.fetch_transcript(&request.url).await?))
}
