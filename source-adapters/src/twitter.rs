//! Twitter/X adapter
//!
//! Two upstreams cooperate here:
//! - the COT orchestration API, which runs a pre-configured research
//!   session over a set of handles and returns prose containing post URLs
//! - the fxtwitter mirror, which hydrates each URL into full post data
//!
//! `analyze` glues them together in either batch mode (one COT run for
//! all handles) or individual mode (one run per handle).

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::{AdapterError, Result};
use common::TwitterConfig;

lazy_static! {
    static ref STATUS_URL_RE: Regex =
        Regex::new(r"https?://(?:x\.com|twitter\.com)/\w+/status/\d+").unwrap();
    static ref OG_DESCRIPTION_RE: Regex = Regex::new(
        r#"<meta\s+(?:property|name)=["']og:description["']\s+content=["']([^"']+)["']"#
    )
    .unwrap();
    static ref TITLE_RE: Regex = Regex::new(r"<title>([^<]+)</title>").unwrap();
    static ref TITLE_AUTHOR_RE: Regex = Regex::new(r"^(.+?)\s+on\s+X:").unwrap();
}

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// COT orchestration client
pub struct CotClient {
    base_url: String,
    session_id: String,
    poll_interval: Duration,
    timeout: Duration,
    client: reqwest::Client,
}

/// Inbound analysis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterAnalysisRequest {
    pub handles: Vec<String>,
    pub topic: String,
    /// Lookback window in weeks
    #[serde(default = "default_timeframe")]
    pub timeframe: u32,
    #[serde(default = "default_post_count")]
    pub post_count: u32,
    /// "batch" (default) or "individual"
    #[serde(default)]
    pub processing_mode: Option<String>,
}

fn default_timeframe() -> u32 {
    1
}

fn default_post_count() -> u32 {
    50
}

/// Full analysis output
#[derive(Debug, Clone, Serialize)]
pub struct TwitterAnalysis {
    pub handles: Vec<String>,
    pub topic: String,
    pub timeframe: u32,
    pub total_posts: usize,
    pub posts: Vec<XPost>,
    pub errors: Vec<PostError>,
}

/// One hydrated post
#[derive(Debug, Clone, Serialize, Default)]
pub struct XPost {
    pub url: String,
    pub author: String,
    pub author_name: String,
    pub text: String,
    pub created_at: String,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub views: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_tweet: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
}

/// A post or handle that could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct PostError {
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub error: String,
}

#[derive(Debug, Deserialize)]
struct CotRunResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CotResults {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<CotResultItem>,
}

#[derive(Debug, Deserialize)]
struct CotResultItem {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct FxResponse {
    #[serde(default)]
    tweet: FxTweet,
}

#[derive(Debug, Deserialize, Default)]
struct FxTweet {
    #[serde(default)]
    author: FxAuthor,
    #[serde(default)]
    text: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    retweets: u64,
    #[serde(default)]
    replies: u64,
    #[serde(default)]
    views: Option<u64>,
    #[serde(default)]
    media: Option<FxMedia>,
    #[serde(default)]
    quote: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
struct FxAuthor {
    #[serde(default)]
    screen_name: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize, Default)]
struct FxMedia {
    #[serde(default)]
    all: Vec<Value>,
}

impl CotClient {
    pub fn new(config: &TwitterConfig) -> Self {
        Self {
            base_url: config.cot_base_url.trim_end_matches('/').to_string(),
            session_id: config.session_id.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    /// Kick off a COT run and poll until its results land.
    pub async fn run_cot(
        &self,
        accounts: &[String],
        topic: &str,
        timeframe: &str,
        post_count: u32,
    ) -> Result<String> {
        info!(
            "Executing COT session {} for {} account(s)",
            self.session_id,
            accounts.len()
        );

        let payload = serde_json::json!({
            "accounts": accounts,
            "topic": topic,
            "timeframe": timeframe,
            "post_count": post_count,
        });

        let response = self
            .client
            .post(format!(
                "{}/api/v2/sessions/run-cot/{}/",
                self.base_url, self.session_id
            ))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "COT run"))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdapterError::Upstream {
                status: status.as_u16(),
                detail: common::truncate_chars(&detail, 500).to_string(),
            });
        }
        let run: CotRunResponse = response.json().await?;
        debug!("COT session created: {}", run.id);

        let results_url = format!("{}/api/v2/sessions/{}/results/", self.base_url, run.id);
        let started = Instant::now();

        while started.elapsed() < self.timeout {
            let response = self
                .client
                .get(&results_url)
                .send()
                .await
                .map_err(|e| AdapterError::from_transport(e, "COT results"))?;
            let results: CotResults = response.json().await?;

            debug!(
                "[{}s] COT status: {}",
                started.elapsed().as_secs(),
                results.status
            );

            if results.status == "idle" {
                if let Some(first) = results.results.into_iter().next() {
                    info!("COT completed after {}s", started.elapsed().as_secs());
                    return Ok(first.content);
                }
            }

            sleep(self.poll_interval).await;
        }

        Err(AdapterError::Timeout(format!(
            "COT execution timed out after {} seconds",
            self.timeout.as_secs()
        )))
    }

    /// Hydrate one post URL via the fxtwitter mirror, falling back to
    /// page meta tags when the mirror fails.
    pub async fn fetch_post(&self, url: &str) -> Result<XPost> {
        let mirror = to_mirror_url(url);

        let response = self
            .client
            .get(&mirror)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "fxtwitter"))?;

        if response.status().is_success() {
            if let Ok(parsed) = response.json::<FxResponse>().await {
                let tweet = parsed.tweet;
                return Ok(XPost {
                    url: url.to_string(),
                    author: or_unknown(tweet.author.screen_name),
                    author_name: or_unknown(tweet.author.name),
                    text: tweet.text,
                    created_at: tweet.created_at,
                    likes: tweet.likes,
                    retweets: tweet.retweets,
                    replies: tweet.replies,
                    views: tweet.views.unwrap_or(0),
                    media: tweet.media.map(|m| m.all).unwrap_or_default(),
                    quoted_tweet: tweet.quote,
                    source_handle: None,
                });
            }
        }

        self.scrape_meta_tags(url).await
    }

    async fn scrape_meta_tags(&self, url: &str) -> Result<XPost> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "post page"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Upstream {
                status: status.as_u16(),
                detail: format!("post fetch failed for {url}"),
            });
        }

        let html = response.text().await?;
        Ok(post_from_meta_tags(url, &html))
    }

    /// Hydrate many URLs sequentially, recording failures per URL.
    pub async fn fetch_all_posts(&self, urls: &[String]) -> (Vec<XPost>, Vec<PostError>) {
        let mut posts = Vec::new();
        let mut errors = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            debug!("Fetching post {}/{}: {}", i + 1, urls.len(), url);
            match self.fetch_post(url).await {
                Ok(post) => posts.push(post),
                Err(e) => errors.push(PostError {
                    handle: "unknown".to_string(),
                    url: Some(url.clone()),
                    error: e.to_string(),
                }),
            }
        }

        (posts, errors)
    }

    /// Full analysis pipeline over a set of handles.
    pub async fn analyze(&self, request: &TwitterAnalysisRequest) -> Result<TwitterAnalysis> {
        let handles: Vec<String> = request
            .handles
            .iter()
            .map(|h| h.trim_start_matches('@').to_string())
            .filter(|h| !h.is_empty())
            .collect();
        let timeframe = timeframe_phrase(request.timeframe);
        let mode = request.processing_mode.as_deref().unwrap_or("batch");

        info!(
            "Twitter analysis: {} account(s), topic '{}', {}, mode {}",
            handles.len(),
            request.topic,
            timeframe,
            mode
        );

        let (mut posts, errors) = if mode == "individual" {
            self.analyze_individual(&handles, &request.topic, &timeframe, request.post_count)
                .await
        } else {
            self.analyze_batch(&handles, &request.topic, &timeframe, request.post_count)
                .await
        };

        posts.sort_by(|a, b| b.views.cmp(&a.views));

        info!(
            "Twitter analysis complete: {} posts, {} errors",
            posts.len(),
            errors.len()
        );

        Ok(TwitterAnalysis {
            handles,
            topic: request.topic.clone(),
            timeframe: request.timeframe,
            total_posts: posts.len(),
            posts,
            errors,
        })
    }

    async fn analyze_batch(
        &self,
        handles: &[String],
        topic: &str,
        timeframe: &str,
        post_count: u32,
    ) -> (Vec<XPost>, Vec<PostError>) {
        let accounts: Vec<String> = handles.iter().map(|h| format!("@{h}")).collect();

        let content = match self.run_cot(&accounts, topic, timeframe, post_count).await {
            Ok(content) => content,
            Err(e) => {
                warn!("COT batch run failed: {}", e);
                return (
                    Vec::new(),
                    vec![PostError {
                        handle: "all".to_string(),
                        url: None,
                        error: e.to_string(),
                    }],
                );
            }
        };

        let urls = extract_status_urls(&content);
        info!("Found {} post URLs in COT result", urls.len());

        let (mut posts, errors) = self.fetch_all_posts(&urls).await;
        for post in &mut posts {
            post.source_handle = Some(match match_handle(&post.author, handles) {
                Some(handle) => format!("@{handle}"),
                None if !post.author.is_empty() && post.author != "Unknown" => {
                    format!("@{}", post.author)
                }
                None => "Unknown".to_string(),
            });
        }

        (posts, errors)
    }

    async fn analyze_individual(
        &self,
        handles: &[String],
        topic: &str,
        timeframe: &str,
        post_count: u32,
    ) -> (Vec<XPost>, Vec<PostError>) {
        let mut all_posts = Vec::new();
        let mut all_errors = Vec::new();

        for (idx, handle) in handles.iter().enumerate() {
            info!(
                "Processing account {}/{}: @{}",
                idx + 1,
                handles.len(),
                handle
            );

            let accounts = vec![format!("@{handle}")];
            match self.run_cot(&accounts, topic, timeframe, post_count).await {
                Ok(content) => {
                    let urls = extract_status_urls(&content);
                    debug!("Found {} URLs for @{}", urls.len(), handle);

                    let (mut posts, errors) = self.fetch_all_posts(&urls).await;
                    for post in &mut posts {
                        post.source_handle = Some(format!("@{handle}"));
                    }
                    all_posts.extend(posts);
                    all_errors.extend(errors.into_iter().map(|mut e| {
                        e.handle = handle.clone();
                        e
                    }));
                }
                Err(e) => {
                    warn!("@{}: {}", handle, e);
                    all_errors.push(PostError {
                        handle: handle.clone(),
                        url: None,
                        error: e.to_string(),
                    });
                }
            }

            // politeness delay between accounts
            sleep(Duration::from_secs(1)).await;
        }

        (all_posts, all_errors)
    }
}

/// Pull every x.com / twitter.com status URL out of free text.
pub fn extract_status_urls(text: &str) -> Vec<String> {
    STATUS_URL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Render the lookback window the way the COT API expects it.
pub fn timeframe_phrase(weeks: u32) -> String {
    if weeks == 1 {
        "last 1 week".to_string()
    } else {
        format!("last {weeks} weeks")
    }
}

/// Match a post author back to one of the requested handles: exact
/// (case-insensitive) first, then substring either way.
fn match_handle(author: &str, handles: &[String]) -> Option<String> {
    let author = author.trim_start_matches('@').to_lowercase();
    if author.is_empty() {
        return None;
    }

    for handle in handles {
        if author == handle.to_lowercase() {
            return Some(handle.clone());
        }
    }
    for handle in handles {
        let handle_lower = handle.to_lowercase();
        if handle_lower.contains(&author) || author.contains(&handle_lower) {
            return Some(handle.clone());
        }
    }
    None
}

fn to_mirror_url(url: &str) -> String {
    if url.contains("x.com") {
        url.replacen("x.com", "api.fxtwitter.com", 1)
    } else if url.contains("twitter.com") {
        url.replacen("twitter.com", "api.fxtwitter.com", 1)
    } else {
        url.to_string()
    }
}

fn or_unknown(value: String) -> String {
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value
    }
}

fn post_from_meta_tags(url: &str, html: &str) -> XPost {
    let mut post = XPost {
        url: url.to_string(),
        ..Default::default()
    };

    if let Some(caps) = OG_DESCRIPTION_RE.captures(html) {
        post.text = caps[1].to_string();
    }

    if let Some(caps) = TITLE_RE.captures(html) {
        let title = caps[1].to_string();
        if let Some(author) = TITLE_AUTHOR_RE.captures(&title) {
            post.author_name = author[1].to_string();
        }
        if post.text.is_empty() {
            post.text = title;
        }
    }

    post
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_status_urls() {
        let text = "see https://x.com/whale/status/123456 and \
                    https://twitter.com/fund/status/789, plus https://example.com/x";
        let urls = extract_status_urls(text);
        assert_eq!(
            urls,
            vec![
                "https://x.com/whale/status/123456",
                "https://twitter.com/fund/status/789"
            ]
        );
    }

    #[test]
    fn test_timeframe_phrase() {
        assert_eq!(timeframe_phrase(1), "last 1 week");
        assert_eq!(timeframe_phrase(4), "last 4 weeks");
    }

    #[test]
    fn test_match_handle_exact_beats_substring() {
        let handles = vec!["chamath".to_string(), "cha".to_string()];
        assert_eq!(match_handle("@Chamath", &handles), Some("chamath".to_string()));
        assert_eq!(match_handle("chamath_pal", &handles), Some("chamath".to_string()));
        assert_eq!(match_handle("", &handles), None);
        assert_eq!(match_handle("nomatch123", &handles), None);
    }

    #[test]
    fn test_to_mirror_url() {
        assert_eq!(
            to_mirror_url("https://x.com/a/status/1"),
            "https://api.fxtwitter.com/a/status/1"
        );
        assert_eq!(
            to_mirror_url("https://twitter.com/a/status/1"),
            "https://api.fxtwitter.com/a/status/1"
        );
    }

    #[test]
    fn test_fx_response_parsing() {
        let json = r#"{
            "tweet": {
                "author": {"screen_name": "whale", "name": "Market Whale"},
                "text": "Buying the dip",
                "created_at": "2025-11-02T09:00:00Z",
                "likes": 1200,
                "retweets": 300,
                "replies": 45,
                "views": 95000,
                "media": {"all": [{"type": "photo"}]},
                "quote": null
            }
        }"#;

        let parsed: FxResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.tweet.author.screen_name, "whale");
        assert_eq!(parsed.tweet.views, Some(95000));
        assert_eq!(parsed.tweet.media.unwrap().all.len(), 1);
    }

    #[test]
    fn test_fx_response_null_views() {
        let json = r#"{"tweet": {"author": {"screen_name": "a"}, "text": "t", "views": null}}"#;
        let parsed: FxResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.tweet.views, None);
    }

    #[test]
    fn test_post_from_meta_tags() {
        let html = r#"<html><head>
            <title>Market Whale on X: "Buying the dip"</title>
            <meta property="og:description" content="Buying the dip" />
        </head></html>"#;

        let post = post_from_meta_tags("https://x.com/whale/status/1", html);
        assert_eq!(post.text, "Buying the dip");
        assert_eq!(post.author_name, "Market Whale");
    }

    #[test]
    fn test_analysis_request_defaults() {
        let json = r#"{"handles": ["@a"], "topic": "AI"}"#;
        let request: TwitterAnalysisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.timeframe, 1);
        assert_eq!(request.post_count, 50);
        assert!(request.processing_mode.is_none());
    }
}
