//! Shared handler state

use chrono::FixedOffset;
use std::sync::Arc;

use common::AppConfig;
use scheduled_agents::{schedule, AgentRunner, AgentStore, ExecutionGate};
use sinks::{BucketeerClient, NotebookRouter};
use source_adapters::{CotClient, PolymarketClient, RedditClient, TranscriptClient};

/// Everything the route handlers need, built once at startup
pub struct AppContext {
    pub config: AppConfig,

    pub polymarket: PolymarketClient,
    pub twitter: CotClient,
    pub youtube: TranscriptClient,
    pub reddit: RedditClient,

    pub notebook: NotebookRouter,
    pub bucketeer: BucketeerClient,

    pub store: Arc<AgentStore>,
    pub runner: Arc<AgentRunner>,
    pub gate: ExecutionGate,
    pub offset: FixedOffset,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Arc<Self> {
        let store = Arc::new(AgentStore::new(&config.agents.store_path));
        let runner = Arc::new(AgentRunner::new(&config, store.clone()));
        let offset = schedule::zone_offset(config.agents.utc_offset_hours);

        Arc::new(Self {
            polymarket: PolymarketClient::new(&config.polymarket),
            twitter: CotClient::new(&config.twitter),
            youtube: TranscriptClient::new(&config.youtube),
            reddit: RedditClient::new(&config.reddit),
            notebook: NotebookRouter::new(&config.notebook),
            bucketeer: BucketeerClient::new(&config.bucketeer),
            store,
            runner,
            gate: ExecutionGate::new(),
            offset,
            config,
        })
    }
}
