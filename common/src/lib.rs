//! Shared building blocks for the Sourcer workspace.
//!
//! This crate holds what every other member needs:
//! - Service configuration (`AppConfig`), loaded from TOML with env
//!   overrides for secrets
//! - Text utilities used when shipping content to downstream sinks and
//!   when rendering markdown reports

pub mod config;
pub mod text;

pub use config::{
    AgentsConfig, AppConfig, BucketeerConfig, NotebookConfig, PolymarketConfig, RedditConfig,
    ServerConfig, TwitterConfig, YoutubeConfig,
};
pub use text::{clean_for_sink, group_thousands, truncate_chars};
