//! Polymarket endpoints

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppContext;
use source_adapters::polymarket::{EventPriceHistory, MarketPriceHistory};
use source_adapters::AdapterError;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    #[serde(default)]
    pub include_closed: bool,
}

fn default_search_limit() -> usize {
    50
}

pub async fn search(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Value>> {
    let results = ctx
        .polymarket
        .search_events(&params.q, params.limit, params.include_closed)
        .await?;

    Ok(Json(json!({
        "query": params.q,
        "count": results.events.len(),
        "events": results.events,
        "tags": results.tags,
    })))
}

pub async fn event(
    State(ctx): State<Arc<AppContext>>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    match ctx.polymarket.fetch_event_by_slug(&slug).await {
        Ok(event) => Ok(Json(event)),
        // some Polymarket URLs carry a market slug, not an event slug
        Err(AdapterError::NotFound(_)) => {
            let market = ctx
                .polymarket
                .fetch_market_by_slug(&slug)
                .await
                .map_err(|_| ApiError::not_found(format!("Event not found: {slug}")))?;
            Ok(Json(market))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn tags(State(ctx): State<Arc<AppContext>>) -> ApiResult<Json<Value>> {
    let tags = ctx.polymarket.list_tags().await?;
    Ok(Json(json!({ "count": tags.len(), "tags": tags })))
}

#[derive(Debug, Deserialize)]
pub struct PriceHistoryParams {
    #[serde(default)]
    pub market_index: usize,
    /// Resolution in minutes (1440 = daily, 60 = hourly)
    #[serde(default = "default_single_fidelity")]
    pub fidelity: u32,
}

fn default_single_fidelity() -> u32 {
    1440
}

pub async fn price_history(
    State(ctx): State<Arc<AppContext>>,
    Path(slug): Path<String>,
    Query(params): Query<PriceHistoryParams>,
) -> ApiResult<Json<MarketPriceHistory>> {
    let history = ctx
        .polymarket
        .market_price_history(&slug, params.market_index, params.fidelity)
        .await?;
    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
pub struct AllPriceHistoryParams {
    #[serde(default = "default_all_fidelity")]
    pub fidelity: u32,
}

fn default_all_fidelity() -> u32 {
    60
}

pub async fn price_history_all(
    State(ctx): State<Arc<AppContext>>,
    Path(slug): Path<String>,
    Query(params): Query<AllPriceHistoryParams>,
) -> ApiResult<Json<EventPriceHistory>> {
    let history = ctx
        .polymarket
        .all_markets_price_history(&slug, params.fidelity)
        .await?;
    Ok(Json(history))
}
