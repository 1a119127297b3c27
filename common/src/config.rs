//! Service configuration
//!
//! Everything is optional in the TOML file; missing sections fall back to
//! the defaults below. API keys and tokens can also be supplied through
//! environment variables so they stay out of committed config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level configuration for the whole service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub polymarket: PolymarketConfig,

    #[serde(default)]
    pub twitter: TwitterConfig,

    #[serde(default)]
    pub youtube: YoutubeConfig,

    #[serde(default)]
    pub reddit: RedditConfig,

    #[serde(default)]
    pub notebook: NotebookConfig,

    #[serde(default)]
    pub bucketeer: BucketeerConfig,

    #[serde(default)]
    pub agents: AgentsConfig,
}

/// HTTP facade bind address and CORS policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Explicit origin allow-list. Credentials are allowed, so a wildcard
    /// origin is not.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:8000".to_string(),
    ]
}

/// Polymarket Gamma + CLOB endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolymarketConfig {
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,

    #[serde(default = "default_clob_url")]
    pub clob_url: String,
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            gamma_url: default_gamma_url(),
            clob_url: default_clob_url(),
        }
    }
}

fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}

fn default_clob_url() -> String {
    "https://clob.polymarket.com".to_string()
}

/// COT orchestration API for X/Twitter analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    #[serde(default = "default_cot_base_url")]
    pub cot_base_url: String,

    /// Pre-configured COT session to clone for each run
    #[serde(default = "default_cot_session_id")]
    pub session_id: String,

    /// Seconds between result polls
    #[serde(default = "default_cot_poll_secs")]
    pub poll_interval_secs: u64,

    /// Overall timeout for one COT run
    #[serde(default = "default_cot_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            cot_base_url: default_cot_base_url(),
            session_id: default_cot_session_id(),
            poll_interval_secs: default_cot_poll_secs(),
            timeout_secs: default_cot_timeout_secs(),
        }
    }
}

fn default_cot_base_url() -> String {
    "https://finchat-api.adgo.io".to_string()
}

fn default_cot_session_id() -> String {
    "692525b7fcc4aae81ac5eaf8".to_string()
}

fn default_cot_poll_secs() -> u64 {
    10
}

fn default_cot_timeout_secs() -> u64 {
    300
}

/// YouTube transcript provider (SearchAPI.io)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default = "default_searchapi_url")]
    pub searchapi_url: String,

    /// Overridden by SEARCHAPI_API_KEY when set
    #[serde(default)]
    pub api_key: String,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            searchapi_url: default_searchapi_url(),
            api_key: String::new(),
        }
    }
}

fn default_searchapi_url() -> String {
    "https://www.searchapi.io/api/v1/search".to_string()
}

/// Reddit public JSON API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_reddit_user_agent")]
    pub user_agent: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: default_reddit_user_agent(),
        }
    }
}

fn default_reddit_user_agent() -> String {
    "Sourcer/1.0 (Market Intelligence Platform)".to_string()
}

/// LLM-based notebook router (l2m2 gateway + Discovery Engine notebooks)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookConfig {
    #[serde(default = "default_l2m2_base_url")]
    pub l2m2_base_url: String,

    /// Overridden by L2M2_API_KEY when set
    #[serde(default)]
    pub l2m2_api_key: String,

    #[serde(default = "default_l2m2_model")]
    pub model: String,

    #[serde(default = "default_notebook_project")]
    pub project_number: String,

    #[serde(default = "default_notebook_location")]
    pub location: String,

    /// Prefix of the regional Discovery Engine hostname, e.g. "global-"
    #[serde(default = "default_notebook_endpoint_location")]
    pub endpoint_location: String,

    /// Bearer token passed through to the notebook API. Overridden by
    /// NOTEBOOK_ACCESS_TOKEN when set.
    #[serde(default)]
    pub access_token: String,

    /// Notebook title -> notebook id
    #[serde(default = "default_notebooks")]
    pub notebooks: BTreeMap<String, String>,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            l2m2_base_url: default_l2m2_base_url(),
            l2m2_api_key: String::new(),
            model: default_l2m2_model(),
            project_number: default_notebook_project(),
            location: default_notebook_location(),
            endpoint_location: default_notebook_endpoint_location(),
            access_token: String::new(),
            notebooks: default_notebooks(),
        }
    }
}

fn default_l2m2_base_url() -> String {
    "https://l2m2.adgo-infra.com/api/v4".to_string()
}

fn default_l2m2_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_notebook_project() -> String {
    "511538466121".to_string()
}

fn default_notebook_location() -> String {
    "global".to_string()
}

fn default_notebook_endpoint_location() -> String {
    "global-".to_string()
}

fn default_notebooks() -> BTreeMap<String, String> {
    let mut notebooks = BTreeMap::new();
    notebooks.insert(
        "V2 - AI Infrastructure: Compute, Chips & Energy".to_string(),
        "f25548c1-5a82-4ed8-a443-fe158924be3d".to_string(),
    );
    notebooks.insert(
        "V2 - Agentic Labor & Vibe Coding: The $10T Labor Arbitrage".to_string(),
        "caaa9690-c773-4a60-96e7-ccf3f547210a".to_string(),
    );
    notebooks.insert(
        "V2 - Venture Metrics, Fund Strategy & Liquidity".to_string(),
        "a2841480-b28d-4c6a-8545-433a322ad39a".to_string(),
    );
    notebooks.insert(
        "V2 - Incumbents vs. The Disruptors: AI Competition & GTM".to_string(),
        "d388e457-604e-47c5-8f44-fa698eab3272".to_string(),
    );
    notebooks.insert(
        "V2 - Geopolitics, China & Sovereign AI (\"Red Stack\")".to_string(),
        "fd8c00fb-2ae3-4eb5-8454-48142b6c6848".to_string(),
    );
    notebooks.insert(
        "V2 - The Frontier Model Race & Public–Private Fusion".to_string(),
        "094f9eec-9420-4b3e-b5a7-6ee14342abee".to_string(),
    );
    notebooks
}

/// Vector-bucket content store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketeerConfig {
    #[serde(default = "default_bucketeer_url")]
    pub base_url: String,

    /// Overridden by BUCKETEER_API_KEY when set
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_bucketeer_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_bucketeer_retries")]
    pub max_retries: u32,

    /// Base backoff delay; doubles per attempt
    #[serde(default = "default_bucketeer_retry_secs")]
    pub retry_delay_secs: u64,
}

impl Default for BucketeerConfig {
    fn default() -> Self {
        Self {
            base_url: default_bucketeer_url(),
            api_key: String::new(),
            timeout_secs: default_bucketeer_timeout_secs(),
            max_retries: default_bucketeer_retries(),
            retry_delay_secs: default_bucketeer_retry_secs(),
        }
    }
}

fn default_bucketeer_url() -> String {
    "https://bucketeer.adgo-infra.com/".to_string()
}

fn default_bucketeer_timeout_secs() -> u64 {
    120
}

fn default_bucketeer_retries() -> u32 {
    3
}

fn default_bucketeer_retry_secs() -> u64 {
    2
}

/// Scheduled-agent subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Flat JSON file holding all agent records
    #[serde(default = "default_agents_store_path")]
    pub store_path: String,

    /// Fixed UTC offset the schedules are interpreted in (hours east).
    /// Default is +7 (Bangkok).
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// Seconds between scheduler due-agent scans
    #[serde(default = "default_tick_secs")]
    pub tick_interval_secs: u64,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            store_path: default_agents_store_path(),
            utc_offset_hours: default_utc_offset_hours(),
            tick_interval_secs: default_tick_secs(),
        }
    }
}

fn default_agents_store_path() -> String {
    "agents.json".to_string()
}

fn default_utc_offset_hours() -> i32 {
    7
}

fn default_tick_secs() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    /// A missing file yields the defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if std::path::Path::new(path).exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", path);
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("SEARCHAPI_API_KEY") {
            self.youtube.api_key = key;
        }
        if let Ok(key) = std::env::var("L2M2_API_KEY") {
            self.notebook.l2m2_api_key = key;
        }
        if let Ok(token) = std::env::var("NOTEBOOK_ACCESS_TOKEN") {
            self.notebook.access_token = token;
        }
        if let Ok(key) = std::env::var("BUCKETEER_API_KEY") {
            self.bucketeer.api_key = key;
        }
        if let Ok(url) = std::env::var("BUCKETEER_BASE_URL") {
            self.bucketeer.base_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.agents.utc_offset_hours, 7);
        assert_eq!(config.notebook.notebooks.len(), 6);
        assert!(config.bucketeer.base_url.ends_with('/'));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config.server.port, deserialized.server.port);
        assert_eq!(config.twitter.session_id, deserialized.twitter.session_id);
        assert_eq!(config.notebook.notebooks, deserialized.notebook.notebooks);
    }

    #[test]
    fn test_partial_file_gets_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9001
            "#,
        )
        .unwrap();

        assert_eq!(parsed.server.port, 9001);
        assert_eq!(parsed.server.host, "0.0.0.0");
        assert_eq!(parsed.agents.tick_interval_secs, 60);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = AppConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8000);
    }
}
