//! Scheduled agents
//!
//! The recurring-query subsystem: persisted agent definitions that are
//! re-executed on a schedule against one of the source adapters, with the
//! formatted result forwarded to the vector-bucket sink. It includes:
//! - Agent records and their flat-file JSON store
//! - Next-run computation for daily/weekly schedules
//! - A serial execution gate (one agent at a time, others queue)
//! - The runner that dispatches to source-specific handlers
//! - The background scheduler loop with restart recovery
//! - Markdown report formatters for the sink

pub mod agent;
pub mod executor;
pub mod format;
pub mod schedule;
pub mod scheduler;
pub mod store;

pub use agent::{AgentRecord, AgentStatus, PolymarketQuery, RedditQuery, SourceQuery};
pub use executor::{AgentRunner, ExecutionGate, RunOutcome};
pub use schedule::{Schedule, ScheduleKind};
pub use scheduler::Scheduler;
pub use store::AgentStore;
