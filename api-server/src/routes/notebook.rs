//! Notebook sink endpoints

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppContext;
use sinks::{RouteOutcome, SourceRequest};

pub async fn add_source(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<SourceRequest>,
) -> ApiResult<Json<RouteOutcome>> {
    Ok(Json(ctx.notebook.add_source(&request).await?))
}

pub async fn notebooks(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let notebooks: Vec<Value> = ctx
        .notebook
        .notebooks()
        .into_iter()
        .map(|(name, id)| json!({ "name": name, "id": id }))
        .collect();
    Json(json!({ "notebooks": notebooks }))
}

pub async fn config(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    Json(ctx.notebook.config_status())
}
