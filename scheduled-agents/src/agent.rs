//! Agent records
//!
//! The serde layout below is the on-disk contract of the agents file:
//! a record carries `source_type` + `query_params` side by side with the
//! schedule fields, so the enum is adjacently tagged and flattened.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::Schedule;
use source_adapters::twitter::TwitterAnalysisRequest;

/// One persisted recurring query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: Uuid,
    pub name: String,

    #[serde(flatten)]
    pub query: SourceQuery,

    #[serde(flatten)]
    pub schedule: Schedule,

    pub status: AgentStatus,

    pub next_run: Option<DateTime<FixedOffset>>,
    pub last_run: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

impl AgentRecord {
    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    /// Due when active and the stored next-run instant has passed.
    pub fn is_due(&self, now: DateTime<FixedOffset>) -> bool {
        self.is_active() && self.next_run.map(|t| t <= now).unwrap_or(false)
    }
}

/// Lifecycle state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Paused,
}

/// The query an agent re-executes, dispatched by source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source_type", content = "query_params", rename_all = "lowercase")]
pub enum SourceQuery {
    Twitter(TwitterAnalysisRequest),
    Reddit(RedditQuery),
    Polymarket(PolymarketQuery),
}

impl SourceQuery {
    pub fn source_name(&self) -> &'static str {
        match self {
            SourceQuery::Twitter(_) => "twitter",
            SourceQuery::Reddit(_) => "reddit",
            SourceQuery::Polymarket(_) => "polymarket",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditQuery {
    pub subreddit: String,
    #[serde(default = "default_reddit_posts")]
    pub post_count: u32,
}

fn default_reddit_posts() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolymarketQuery {
    pub keyword: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ScheduleKind;
    use chrono::TimeZone;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn test_record_roundtrips_through_file_shape() {
        let json = r#"{
            "id": "4a3f9c2e-8d1b-4f6a-9c0d-2e5b7a8f1c3d",
            "name": "WSB daily",
            "source_type": "reddit",
            "query_params": {"subreddit": "wallstreetbets", "post_count": 15},
            "schedule": "daily",
            "schedule_time": "07:30",
            "status": "active",
            "next_run": "2025-12-08T07:30:00+07:00",
            "last_run": null,
            "created_at": "2025-12-01T10:00:00+07:00"
        }"#;

        let record: AgentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "WSB daily");
        assert_eq!(record.schedule.kind, ScheduleKind::Daily);
        assert_eq!(record.schedule.time, "07:30");
        assert!(record.is_active());
        match &record.query {
            SourceQuery::Reddit(q) => {
                assert_eq!(q.subreddit, "wallstreetbets");
                assert_eq!(q.post_count, 15);
            }
            other => panic!("unexpected query: {other:?}"),
        }

        // and back out with the same field names
        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["source_type"], "reddit");
        assert_eq!(value["query_params"]["subreddit"], "wallstreetbets");
        assert_eq!(value["schedule"], "daily");
        assert_eq!(value["schedule_time"], "07:30");
        assert_eq!(value["status"], "active");
    }

    #[test]
    fn test_polymarket_query_shape() {
        let json = r#"{
            "id": "4a3f9c2e-8d1b-4f6a-9c0d-2e5b7a8f1c3e",
            "name": "Fed watch",
            "source_type": "polymarket",
            "query_params": {"keyword": "fed rates"},
            "schedule": "weekly",
            "schedule_time": "0",
            "status": "paused",
            "next_run": null,
            "last_run": null,
            "created_at": "2025-12-01T10:00:00+07:00"
        }"#;

        let record: AgentRecord = serde_json::from_str(json).unwrap();
        assert!(!record.is_active());
        assert_eq!(record.query.source_name(), "polymarket");
    }

    #[test]
    fn test_is_due() {
        let now = offset().with_ymd_and_hms(2025, 12, 8, 8, 0, 0).unwrap();
        let json = r#"{
            "id": "4a3f9c2e-8d1b-4f6a-9c0d-2e5b7a8f1c3f",
            "name": "due test",
            "source_type": "polymarket",
            "query_params": {"keyword": "ai"},
            "schedule": "daily",
            "schedule_time": "07:30",
            "status": "active",
            "next_run": "2025-12-08T07:30:00+07:00",
            "last_run": null,
            "created_at": "2025-12-01T10:00:00+07:00"
        }"#;
        let mut record: AgentRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_due(now));

        record.next_run = Some(offset().with_ymd_and_hms(2025, 12, 9, 7, 30, 0).unwrap());
        assert!(!record.is_due(now));

        record.next_run = None;
        assert!(!record.is_due(now));
    }
}
