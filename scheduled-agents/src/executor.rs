//! Serial agent execution
//!
//! One agent runs at a time, system-wide. The gate holds a single mutex
//! permit; an agent submitted while the permit is taken joins a FIFO
//! queue and is started by whichever task releases the permit. The
//! running set rejects duplicate submissions of the same agent.

use chrono::FixedOffset;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::{AgentRecord, SourceQuery};
use crate::format;
use crate::schedule;
use crate::store::AgentStore;
use common::AppConfig;
use sinks::BucketeerClient;
use source_adapters::{CotClient, PolymarketClient, RedditClient};

/// Events searched when a polymarket agent fires
const AGENT_SEARCH_LIMIT: usize = 20;

/// What happened to a submitted agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Execution began immediately
    Started,
    /// Another agent holds the permit; this one waits in the queue
    Queued,
    /// The same agent is already running or queued
    AlreadyRunning,
}

enum Begin {
    Run(OwnedMutexGuard<()>),
    Queued,
    AlreadyRunning,
}

struct GateInner {
    permit: Arc<AsyncMutex<()>>,
    queue: Mutex<VecDeque<AgentRecord>>,
    running: DashMap<Uuid, ()>,
}

/// Serial-execution coordinator
#[derive(Clone)]
pub struct ExecutionGate {
    inner: Arc<GateInner>,
}

impl Default for ExecutionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionGate {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GateInner {
                permit: Arc::new(AsyncMutex::new(())),
                queue: Mutex::new(VecDeque::new()),
                running: DashMap::new(),
            }),
        }
    }

    /// Submit an agent for execution. Never blocks: the outcome reports
    /// whether the run started, queued, or was dropped as a duplicate.
    pub fn submit(&self, agent: AgentRecord, runner: Arc<AgentRunner>) -> RunOutcome {
        match self.try_begin(agent.clone()) {
            Begin::AlreadyRunning => {
                warn!(
                    "Agent '{}' ({}) is already running, skipping duplicate execution",
                    agent.name, agent.id
                );
                RunOutcome::AlreadyRunning
            }
            Begin::Queued => {
                info!("Another agent is running, queuing '{}' ({})", agent.name, agent.id);
                RunOutcome::Queued
            }
            Begin::Run(guard) => {
                let gate = self.clone();
                tokio::spawn(async move {
                    let _permit = guard;
                    let mut current = agent;
                    loop {
                        runner.execute(&current).await;
                        match gate.finish(current.id) {
                            Some(next) => {
                                info!("Processing queued agent '{}' ({})", next.name, next.id);
                                current = next;
                            }
                            None => break,
                        }
                    }
                });
                RunOutcome::Started
            }
        }
    }

    /// True when the agent is currently executing or waiting.
    pub fn is_pending(&self, id: Uuid) -> bool {
        self.inner.running.contains_key(&id) || self.queue().iter().any(|a| a.id == id)
    }

    fn try_begin(&self, agent: AgentRecord) -> Begin {
        if self.is_pending(agent.id) {
            return Begin::AlreadyRunning;
        }

        match self.inner.permit.clone().try_lock_owned() {
            Ok(guard) => {
                self.inner.running.insert(agent.id, ());
                Begin::Run(guard)
            }
            Err(_) => {
                self.queue().push_back(agent);
                Begin::Queued
            }
        }
    }

    /// Mark an agent finished and claim the next queued one, which
    /// becomes running under the same permit.
    fn finish(&self, id: Uuid) -> Option<AgentRecord> {
        self.inner.running.remove(&id);
        let next = self.queue().pop_front()?;
        self.inner.running.insert(next.id, ());
        Some(next)
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<AgentRecord>> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Executes one agent end to end: source query, report formatting,
/// sink push, store bookkeeping. Failures are logged, never propagated;
/// the schedule always advances so a broken agent cannot wedge the loop.
pub struct AgentRunner {
    store: Arc<AgentStore>,
    polymarket: Arc<PolymarketClient>,
    twitter: Arc<CotClient>,
    reddit: Arc<RedditClient>,
    bucketeer: Arc<BucketeerClient>,
    offset: FixedOffset,
}

impl AgentRunner {
    pub fn new(config: &AppConfig, store: Arc<AgentStore>) -> Self {
        Self {
            store,
            polymarket: Arc::new(PolymarketClient::new(&config.polymarket)),
            twitter: Arc::new(CotClient::new(&config.twitter)),
            reddit: Arc::new(RedditClient::new(&config.reddit)),
            bucketeer: Arc::new(BucketeerClient::new(&config.bucketeer)),
            offset: schedule::zone_offset(config.agents.utc_offset_hours),
        }
    }

    pub async fn execute(&self, agent: &AgentRecord) {
        info!("Executing agent '{}' ({})", agent.name, agent.id);

        let now = schedule::now_in(self.offset);
        let next_run = match agent.schedule.next_run(now) {
            Ok(next) => Some(next),
            Err(e) => {
                error!("Agent '{}' has an invalid schedule: {}", agent.name, e);
                None
            }
        };

        let succeeded = match self.run_source(agent).await {
            Ok(report) => match self.bucketeer.add_content(&report).await {
                Ok(stored) => {
                    info!(
                        "Agent '{}' completed, sink id: {}",
                        agent.name,
                        stored
                            .id
                            .as_ref()
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "unknown".to_string())
                    );
                    true
                }
                Err(e) => {
                    error!("Agent '{}' sink push failed: {}", agent.name, e);
                    false
                }
            },
            Err(e) => {
                error!("Error executing agent '{}': {}", agent.name, e);
                false
            }
        };

        let last_run = succeeded.then_some(now);
        if let Err(e) = self.store.mark_ran(agent.id, last_run, next_run) {
            error!("Failed to record run for agent '{}': {}", agent.name, e);
        }
    }

    async fn run_source(&self, agent: &AgentRecord) -> anyhow::Result<String> {
        let now = schedule::now_in(self.offset);
        match &agent.query {
            SourceQuery::Twitter(query) => {
                let analysis = self.twitter.analyze(query).await?;
                Ok(format::twitter_report(
                    &query.topic,
                    query.timeframe,
                    &analysis.handles,
                    &analysis.posts,
                    now,
                ))
            }
            SourceQuery::Reddit(query) => {
                let analysis = self
                    .reddit
                    .fetch_subreddit(&query.subreddit, query.post_count)
                    .await?;
                Ok(format::reddit_report(&analysis.subreddit, &analysis.posts, now))
            }
            SourceQuery::Polymarket(query) => {
                let results = self
                    .polymarket
                    .search_events(&query.keyword, AGENT_SEARCH_LIMIT, false)
                    .await?;
                Ok(format::polymarket_report(&query.keyword, &results.events, now))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentStatus, PolymarketQuery};
    use crate::schedule::Schedule;
    use chrono::TimeZone;

    fn record(name: &str) -> AgentRecord {
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        AgentRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            query: SourceQuery::Polymarket(PolymarketQuery {
                keyword: "fed".to_string(),
            }),
            schedule: Schedule::daily("07:30"),
            status: AgentStatus::Active,
            next_run: None,
            last_run: None,
            created_at: offset.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_gate_runs_first_and_queues_second() {
        let gate = ExecutionGate::new();
        let first = record("first");
        let second = record("second");

        let begin = gate.try_begin(first.clone());
        assert!(matches!(begin, Begin::Run(_)));
        assert!(gate.is_pending(first.id));

        // the permit is taken, so the second agent waits
        assert!(matches!(gate.try_begin(second.clone()), Begin::Queued));
        assert!(gate.is_pending(second.id));

        // finishing the first hands the permit to the second
        let next = gate.finish(first.id).unwrap();
        assert_eq!(next.id, second.id);
        assert!(!gate.is_pending(first.id));
        assert!(gate.is_pending(second.id));

        assert!(gate.finish(second.id).is_none());
        assert!(!gate.is_pending(second.id));
    }

    #[test]
    fn test_gate_rejects_duplicates() {
        let gate = ExecutionGate::new();
        let agent = record("dup");

        let _guard = match gate.try_begin(agent.clone()) {
            Begin::Run(guard) => guard,
            _ => panic!("expected Run"),
        };
        // same id cannot run or queue twice
        assert!(matches!(gate.try_begin(agent.clone()), Begin::AlreadyRunning));

        let other = record("other");
        assert!(matches!(gate.try_begin(other.clone()), Begin::Queued));
        // queued agents are duplicates too
        assert!(matches!(gate.try_begin(other), Begin::AlreadyRunning));
    }

    #[test]
    fn test_gate_permit_frees_when_queue_empty() {
        let gate = ExecutionGate::new();
        let first = record("first");

        let guard = match gate.try_begin(first.clone()) {
            Begin::Run(guard) => guard,
            _ => panic!("expected Run"),
        };
        assert!(gate.finish(first.id).is_none());
        drop(guard);

        // permit is free again
        let second = record("second");
        assert!(matches!(gate.try_begin(second), Begin::Run(_)));
    }
}
