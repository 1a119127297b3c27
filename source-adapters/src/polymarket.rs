//! Polymarket adapter
//!
//! Talks to two upstream APIs:
//! - the Gamma API for events, markets and tags
//! - the CLOB API for historical prices
//!
//! Events and tags travel through the system as loosely-typed JSON: the
//! facade reshapes upstream documents, it does not re-model them. The
//! handful of fields the system actually reads (slug, title, closed,
//! clobTokenIds, ...) are accessed through the helpers below, which also
//! cope with Gamma's habit of string-encoding nested JSON arrays.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{AdapterError, Result};
use common::PolymarketConfig;

/// Line colors assigned round-robin to outcomes in multi-market charts
const OUTCOME_COLORS: [&str; 10] = [
    "#f97316", // orange
    "#3b82f6", // blue
    "#22c55e", // green
    "#eab308", // yellow
    "#ec4899", // pink
    "#8b5cf6", // purple
    "#06b6d4", // cyan
    "#ef4444", // red
    "#84cc16", // lime
    "#f59e0b", // amber
];

/// Gamma + CLOB client
pub struct PolymarketClient {
    gamma_url: String,
    clob_url: String,
    client: reqwest::Client,
}

/// Keyword search output: matching events plus the tags Gamma suggested
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub events: Vec<Value>,
    pub tags: Vec<Value>,
}

/// One CLOB price observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    /// Unix timestamp (seconds)
    pub t: i64,
    /// Price in probability space, 0..=1
    pub p: f64,
}

#[derive(Debug, Deserialize)]
struct PriceHistoryResponse {
    #[serde(default)]
    history: Vec<PricePoint>,
}

/// Price history for a single market within an event
#[derive(Debug, Clone, Serialize)]
pub struct MarketPriceHistory {
    pub event_slug: String,
    pub question: Option<String>,
    pub token_id: String,
    pub outcome: String,
    pub fidelity_minutes: u32,
    pub data_points: usize,
    pub history: Vec<PricePoint>,
}

/// Price history for every open market in an event
#[derive(Debug, Clone, Serialize)]
pub struct EventPriceHistory {
    pub event_slug: String,
    pub title: Option<String>,
    pub fidelity_minutes: u32,
    pub markets: Vec<OutcomeHistory>,
}

/// One outcome series inside an [`EventPriceHistory`]
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeHistory {
    pub name: String,
    pub token_id: String,
    pub current_probability: f64,
    pub color: String,
    pub history: Vec<PricePoint>,
}

impl PolymarketClient {
    pub fn new(config: &PolymarketConfig) -> Self {
        Self {
            gamma_url: config.gamma_url.trim_end_matches('/').to_string(),
            clob_url: config.clob_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Search events by keyword, merging four strategies in decreasing
    /// order of relevance and deduplicating by slug. Each strategy is
    /// best-effort; a failing one is logged and skipped.
    pub async fn search_events(
        &self,
        keyword: &str,
        limit: usize,
        include_closed: bool,
    ) -> Result<SearchResults> {
        info!("Searching Polymarket for '{}' (limit: {})", keyword, limit);

        let keyword_lower = keyword.to_lowercase();
        let mut events: Vec<Value> = Vec::new();
        let mut seen = HashSet::new();
        let mut tags: Vec<Value> = Vec::new();

        // 1. public-search: most relevant, also yields tags
        match self.public_search(keyword).await {
            Ok(results) => {
                let found = results
                    .get("events")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                debug!("public-search returned {} events", found.len());
                for event in found {
                    add_unique(&mut events, &mut seen, event);
                }
                if let Some(found_tags) = results.get("tags").and_then(Value::as_array) {
                    tags = found_tags.clone();
                }
            }
            Err(e) => warn!("public-search failed: {}", e),
        }

        // 2. title_contains: the API filter is loose, so re-verify
        if events.len() < limit {
            let page_limit = (limit * 5).min(200);
            match self
                .fetch_events_page(&[
                    ("title_contains", keyword.to_string()),
                    ("limit", page_limit.to_string()),
                    ("closed", include_closed.to_string()),
                    ("order", "volume".to_string()),
                    ("ascending", "false".to_string()),
                ])
                .await
            {
                Ok(found) => {
                    let mut added = 0usize;
                    for event in found {
                        if title_matches(&event, &keyword_lower, false)
                            && add_unique(&mut events, &mut seen, event)
                        {
                            added += 1;
                        }
                    }
                    debug!("title_contains added {} events", added);
                }
                Err(e) => warn!("title_contains search failed: {}", e),
            }
        }

        // 3. scan top markets, pulling in their parent events
        if events.len() < limit {
            if let Err(e) = self
                .search_via_markets(&keyword_lower, include_closed, limit, &mut events, &mut seen)
                .await
            {
                warn!("markets search failed: {}", e);
            }
        }

        // 4. broad event fetch with client-side substring filter
        if events.len() < limit {
            match self
                .fetch_events_page(&[
                    ("limit", "500".to_string()),
                    ("closed", include_closed.to_string()),
                    ("order", "volume".to_string()),
                    ("ascending", "false".to_string()),
                ])
                .await
            {
                Ok(found) => {
                    for event in found {
                        if title_matches(&event, &keyword_lower, true) {
                            add_unique(&mut events, &mut seen, event);
                            if events.len() >= limit {
                                break;
                            }
                        }
                    }
                }
                Err(e) => warn!("broad events fetch failed: {}", e),
            }
        }

        if !include_closed {
            events.retain(|e| !e.get("closed").and_then(Value::as_bool).unwrap_or(false));
        }
        events.truncate(limit);

        info!("Search final: {} events, {} tags", events.len(), tags.len());
        Ok(SearchResults { events, tags })
    }

    async fn public_search(&self, keyword: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/public-search", self.gamma_url))
            .query(&[("q", keyword)])
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "Gamma public-search"))?;
        self.expect_json(response).await
    }

    async fn fetch_events_page(&self, query: &[(&str, String)]) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(format!("{}/events", self.gamma_url))
            .query(query)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "Gamma events"))?;
        let value = self.expect_json(response).await?;
        Ok(value.as_array().cloned().unwrap_or_default())
    }

    async fn search_via_markets(
        &self,
        keyword_lower: &str,
        include_closed: bool,
        limit: usize,
        events: &mut Vec<Value>,
        seen: &mut HashSet<String>,
    ) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/markets", self.gamma_url))
            .query(&[
                ("limit", "200".to_string()),
                ("closed", include_closed.to_string()),
                ("order", "volume".to_string()),
                ("ascending", "false".to_string()),
            ])
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "Gamma markets"))?;
        let markets = self.expect_json(response).await?;

        for market in markets.as_array().into_iter().flatten() {
            let question = value_str(market, "question").to_lowercase();
            let group_title = value_str(market, "groupItemTitle").to_lowercase();
            if !question.contains(keyword_lower) && !group_title.contains(keyword_lower) {
                continue;
            }

            let event_slug = value_str(market, "eventSlug");
            if event_slug.is_empty() || seen.contains(event_slug) {
                continue;
            }

            match self.fetch_event_by_slug(event_slug).await {
                Ok(event) => {
                    add_unique(events, seen, event);
                }
                Err(e) => debug!("parent event {} fetch failed: {}", event_slug, e),
            }

            if events.len() >= limit {
                break;
            }
        }
        Ok(())
    }

    /// Fetch a specific event by its URL slug
    pub async fn fetch_event_by_slug(&self, slug: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/events/slug/{}", self.gamma_url, slug))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "Gamma event"))?;
        if response.status().as_u16() == 404 {
            return Err(AdapterError::NotFound(format!("Event not found: {slug}")));
        }
        self.expect_json(response).await
    }

    /// Fetch a specific market by its URL slug
    pub async fn fetch_market_by_slug(&self, slug: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/markets/slug/{}", self.gamma_url, slug))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "Gamma market"))?;
        if response.status().as_u16() == 404 {
            return Err(AdapterError::NotFound(format!("Market not found: {slug}")));
        }
        self.expect_json(response).await
    }

    /// List every available tag
    pub async fn list_tags(&self) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(format!("{}/tags", self.gamma_url))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "Gamma tags"))?;
        let value = self.expect_json(response).await?;
        Ok(value.as_array().cloned().unwrap_or_default())
    }

    /// Fetch all events carrying a tag, paging until a short page
    pub async fn fetch_events_by_tag(
        &self,
        tag_id: i64,
        page_limit: usize,
        closed: bool,
    ) -> Result<Vec<Value>> {
        self.fetch_tagged(tag_id, page_limit, closed, "events").await
    }

    /// Fetch all markets carrying a tag, paging until a short page
    pub async fn fetch_markets_by_tag(
        &self,
        tag_id: i64,
        page_limit: usize,
        closed: bool,
    ) -> Result<Vec<Value>> {
        self.fetch_tagged(tag_id, page_limit, closed, "markets").await
    }

    async fn fetch_tagged(
        &self,
        tag_id: i64,
        page_limit: usize,
        closed: bool,
        resource: &str,
    ) -> Result<Vec<Value>> {
        let page_limit = page_limit.max(1);
        let mut all = Vec::new();
        let mut offset = 0usize;

        loop {
            let response = self
                .client
                .get(format!("{}/{}", self.gamma_url, resource))
                .query(&[
                    ("tag_id", tag_id.to_string()),
                    ("limit", page_limit.to_string()),
                    ("offset", offset.to_string()),
                    ("closed", closed.to_string()),
                ])
                .timeout(Duration::from_secs(30))
                .send()
                .await
                .map_err(|e| AdapterError::from_transport(e, "Gamma tag listing"))?;
            let page = self
                .expect_json(response)
                .await?
                .as_array()
                .cloned()
                .unwrap_or_default();

            if page.is_empty() {
                break;
            }
            let short = page.len() < page_limit;
            all.extend(page);
            debug!("tag {}: fetched {} {} so far", tag_id, all.len(), resource);
            if short {
                break;
            }
            offset += page_limit;
        }

        Ok(all)
    }

    /// CLOB token ids of one market within an event: (yes, no, question)
    pub async fn clob_token_ids(
        &self,
        event_slug: &str,
        market_index: usize,
    ) -> Result<(Option<String>, Option<String>, Option<String>)> {
        let event = self.fetch_event_by_slug(event_slug).await?;
        let markets = event
            .get("markets")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let market = markets.get(market_index).ok_or_else(|| {
            AdapterError::InvalidInput(format!(
                "Market index {} out of range. Event has {} markets.",
                market_index,
                markets.len()
            ))
        })?;

        let token_ids = market
            .get("clobTokenIds")
            .map(parse_string_array)
            .unwrap_or_default();

        Ok((
            token_ids.first().cloned(),
            token_ids.get(1).cloned(),
            market.get("question").and_then(Value::as_str).map(String::from),
        ))
    }

    /// Raw price history for one CLOB token
    pub async fn fetch_price_history(
        &self,
        token_id: &str,
        interval: &str,
        fidelity: u32,
    ) -> Result<Vec<PricePoint>> {
        let response = self
            .client
            .get(format!("{}/prices-history", self.clob_url))
            .query(&[
                ("market", token_id.to_string()),
                ("interval", interval.to_string()),
                ("fidelity", fidelity.to_string()),
            ])
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "CLOB prices-history"))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdapterError::Upstream {
                status: status.as_u16(),
                detail: common::truncate_chars(&detail, 500).to_string(),
            });
        }
        let parsed: PriceHistoryResponse = response.json().await?;
        Ok(parsed.history)
    }

    /// Full price history for one market within an event
    pub async fn market_price_history(
        &self,
        event_slug: &str,
        market_index: usize,
        fidelity: u32,
    ) -> Result<MarketPriceHistory> {
        let (yes_token, _no_token, question) =
            self.clob_token_ids(event_slug, market_index).await?;

        let token_id = yes_token.ok_or_else(|| {
            AdapterError::NotFound("Could not find token ID for this market".to_string())
        })?;

        let history = self.fetch_price_history(&token_id, "max", fidelity).await?;

        Ok(MarketPriceHistory {
            event_slug: event_slug.to_string(),
            question,
            token_id,
            outcome: "Yes".to_string(),
            fidelity_minutes: fidelity,
            data_points: history.len(),
            history,
        })
    }

    /// Price history for every open market in an event. Markets whose
    /// history fetch fails are skipped, not fatal.
    pub async fn all_markets_price_history(
        &self,
        event_slug: &str,
        fidelity: u32,
    ) -> Result<EventPriceHistory> {
        let event = self.fetch_event_by_slug(event_slug).await?;
        let markets = event
            .get("markets")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut histories = Vec::new();
        for (i, market) in markets.iter().enumerate() {
            if market.get("closed").and_then(Value::as_bool).unwrap_or(false) {
                continue;
            }

            let token_ids = market
                .get("clobTokenIds")
                .map(parse_string_array)
                .unwrap_or_default();
            let Some(yes_token) = token_ids.first() else {
                continue;
            };

            let name = outcome_name(market, i);
            let current_prob = current_probability(market);

            match self.fetch_price_history(yes_token, "max", fidelity).await {
                Ok(history) if !history.is_empty() => {
                    histories.push(OutcomeHistory {
                        name,
                        token_id: yes_token.clone(),
                        current_probability: current_prob,
                        color: OUTCOME_COLORS[i % OUTCOME_COLORS.len()].to_string(),
                        history,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!("history fetch for '{}' failed: {}", name, e),
            }
        }

        Ok(EventPriceHistory {
            event_slug: event_slug.to_string(),
            title: event.get("title").and_then(Value::as_str).map(String::from),
            fidelity_minutes: fidelity,
            markets: histories,
        })
    }

    async fn expect_json(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdapterError::Upstream {
                status: status.as_u16(),
                detail: common::truncate_chars(&detail, 500).to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

/// Push an event onto the result list unless its slug was already seen.
fn add_unique(events: &mut Vec<Value>, seen: &mut HashSet<String>, event: Value) -> bool {
    let slug = value_str(&event, "slug");
    if slug.is_empty() || seen.contains(slug) {
        return false;
    }
    seen.insert(slug.to_string());
    events.push(event);
    true
}

/// Case-insensitive substring match on the event title (and optionally
/// the description).
fn title_matches(event: &Value, keyword_lower: &str, include_description: bool) -> bool {
    if value_str(event, "title").to_lowercase().contains(keyword_lower) {
        return true;
    }
    include_description
        && value_str(event, "description")
            .to_lowercase()
            .contains(keyword_lower)
}

fn value_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Gamma sometimes returns nested arrays as JSON-encoded strings.
fn parse_string_array(value: &Value) -> Vec<String> {
    match value {
        Value::String(encoded) => serde_json::from_str(encoded).unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

fn outcome_name(market: &Value, index: usize) -> String {
    let group_title = value_str(market, "groupItemTitle");
    if !group_title.is_empty() {
        return group_title.to_string();
    }
    let question = value_str(market, "question");
    if !question.is_empty() {
        return question.to_string();
    }
    format!("Outcome {}", index + 1)
}

/// First outcome price, tolerating string-encoded arrays of strings.
fn current_probability(market: &Value) -> f64 {
    let prices = market
        .get("outcomePrices")
        .map(parse_string_array)
        .unwrap_or_default();
    prices
        .first()
        .and_then(|p| p.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_string_array_from_encoded_string() {
        let value = json!("[\"1234\", \"5678\"]");
        assert_eq!(parse_string_array(&value), vec!["1234", "5678"]);
    }

    #[test]
    fn test_parse_string_array_from_real_array() {
        let value = json!(["a", "b"]);
        assert_eq!(parse_string_array(&value), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_string_array_garbage() {
        assert!(parse_string_array(&json!(42)).is_empty());
        assert!(parse_string_array(&json!("not json")).is_empty());
    }

    #[test]
    fn test_add_unique_dedupes_by_slug() {
        let mut events = Vec::new();
        let mut seen = HashSet::new();

        assert!(add_unique(&mut events, &mut seen, json!({"slug": "fed-rates"})));
        assert!(!add_unique(&mut events, &mut seen, json!({"slug": "fed-rates"})));
        assert!(!add_unique(&mut events, &mut seen, json!({"title": "no slug"})));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_title_matches() {
        let event = json!({
            "title": "Will Bitcoin hit $100k?",
            "description": "Resolution based on Coinbase spot price"
        });
        assert!(title_matches(&event, "bitcoin", false));
        assert!(!title_matches(&event, "coinbase", false));
        assert!(title_matches(&event, "coinbase", true));
    }

    #[test]
    fn test_price_history_response_parsing() {
        let json = r#"{"history": [{"t": 1708627200, "p": 0.55}, {"t": 1708713600, "p": 0.61}]}"#;
        let parsed: PriceHistoryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.history.len(), 2);
        assert_eq!(parsed.history[0].t, 1708627200);
        assert!((parsed.history[1].p - 0.61).abs() < f64::EPSILON);
    }

    #[test]
    fn test_outcome_name_fallbacks() {
        assert_eq!(outcome_name(&json!({"groupItemTitle": "Yes"}), 0), "Yes");
        assert_eq!(
            outcome_name(&json!({"question": "Will it rain?"}), 0),
            "Will it rain?"
        );
        assert_eq!(outcome_name(&json!({}), 2), "Outcome 3");
    }

    #[test]
    fn test_current_probability_from_encoded_prices() {
        let market = json!({"outcomePrices": "[\"0.62\", \"0.38\"]"});
        assert!((current_probability(&market) - 0.62).abs() < f64::EPSILON);
        assert_eq!(current_probability(&json!({})), 0.0);
    }

    #[test]
    fn test_outcome_colors_cycle() {
        assert_eq!(OUTCOME_COLORS[0], OUTCOME_COLORS[10 % OUTCOME_COLORS.len()]);
    }
}
