//! Reddit adapter
//!
//! Uses Reddit's public JSON API: no OAuth, just a well-behaved
//! User-Agent and a politeness delay between comment fetches.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{AdapterError, Result};
use common::RedditConfig;

/// Requested post counts are clamped into this range
pub const MIN_POSTS: u32 = 5;
pub const MAX_POSTS: u32 = 20;

const COMMENTS_PER_POST: usize = 10;

/// Public JSON API client
pub struct RedditClient {
    user_agent: String,
    client: reqwest::Client,
}

/// One reshaped submission with its top comments
#[derive(Debug, Clone, Serialize)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    pub author: String,
    pub selftext: String,
    pub url: String,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: u64,
    pub created_utc: f64,
    pub subreddit: String,
    pub is_self: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    pub thumbnail: String,
    pub flair: String,
    pub comments: Vec<RedditComment>,
}

/// One reshaped comment
#[derive(Debug, Clone, Serialize)]
pub struct RedditComment {
    pub author: String,
    pub body: String,
    pub score: i64,
    pub created_utc: f64,
    pub permalink: String,
}

/// Subreddit fetch output
#[derive(Debug, Clone, Serialize)]
pub struct RedditAnalysis {
    pub subreddit: String,
    pub post_count: usize,
    pub posts: Vec<RedditPost>,
    pub errors: Vec<String>,
}

impl RedditClient {
    pub fn new(config: &RedditConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch hot posts (with top comments) from a subreddit.
    pub async fn fetch_subreddit(&self, subreddit: &str, post_count: u32) -> Result<RedditAnalysis> {
        let subreddit = normalize_subreddit(subreddit);
        let post_count = clamp_post_count(post_count);

        info!("Fetching {} posts from r/{}", post_count, subreddit);

        let listing_url = format!(
            "https://www.reddit.com/r/{}/hot.json?limit={}",
            subreddit, post_count
        );
        let response = self
            .client
            .get(&listing_url)
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "Reddit listing"))?;

        match response.status().as_u16() {
            404 => {
                return Err(AdapterError::NotFound(format!(
                    "Subreddit r/{subreddit} not found"
                )))
            }
            403 => {
                return Err(AdapterError::Forbidden(format!(
                    "Subreddit r/{subreddit} is private or quarantined"
                )))
            }
            status if status != 200 => {
                return Err(AdapterError::Upstream {
                    status,
                    detail: format!("Reddit API error: {status}"),
                })
            }
            _ => {}
        }

        let data: Value = response.json().await?;
        let children = data
            .pointer("/data/children")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        info!("Found {} posts in r/{}", children.len(), subreddit);

        let mut posts = Vec::new();
        for child in &children {
            let Some(post_data) = child.get("data") else {
                continue;
            };
            // pinned announcements would crowd out actual discussion
            if post_data.get("stickied").and_then(Value::as_bool).unwrap_or(false) {
                continue;
            }

            let permalink = str_field(post_data, "permalink");
            let comments = match self.fetch_comments(&permalink).await {
                Ok(comments) => comments,
                Err(e) => {
                    warn!(
                        "Error fetching comments for post {}: {}",
                        str_field(post_data, "id"),
                        e
                    );
                    Vec::new()
                }
            };

            posts.push(reshape_post(post_data, &subreddit, comments));

            sleep(Duration::from_millis(500)).await;
        }

        posts.sort_by(|a, b| b.score.cmp(&a.score));

        Ok(RedditAnalysis {
            subreddit,
            post_count: posts.len(),
            posts,
            errors: Vec::new(),
        })
    }

    async fn fetch_comments(&self, permalink: &str) -> Result<Vec<RedditComment>> {
        let url = format!(
            "https://www.reddit.com{}.json?limit=10&depth=2",
            permalink
        );
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(e, "Reddit comments"))?;

        if response.status().as_u16() != 200 {
            return Ok(Vec::new());
        }

        let data: Value = response.json().await?;
        Ok(reshape_comments(&data))
    }
}

/// Accept "r/foo", "/r/foo" or "foo".
pub fn normalize_subreddit(name: &str) -> String {
    let name = name.trim();
    let name = name.strip_prefix("/r/").unwrap_or(name);
    let name = name.strip_prefix("r/").unwrap_or(name);
    name.to_string()
}

pub fn clamp_post_count(count: u32) -> u32 {
    count.clamp(MIN_POSTS, MAX_POSTS)
}

fn reshape_post(data: &Value, subreddit: &str, comments: Vec<RedditComment>) -> RedditPost {
    let permalink = str_field(data, "permalink");
    let is_self = data.get("is_self").and_then(Value::as_bool).unwrap_or(true);

    RedditPost {
        id: str_field(data, "id"),
        title: str_field(data, "title"),
        author: author_field(data),
        selftext: str_field(data, "selftext"),
        url: format!("https://reddit.com{permalink}"),
        score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
        upvote_ratio: data
            .get("upvote_ratio")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        num_comments: data
            .get("num_comments")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        created_utc: data
            .get("created_utc")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        subreddit: subreddit.to_string(),
        is_self,
        link_url: if is_self {
            None
        } else {
            data.get("url").and_then(Value::as_str).map(String::from)
        },
        thumbnail: str_field(data, "thumbnail"),
        flair: str_field(data, "link_flair_text"),
        comments,
    }
}

/// The comments endpoint returns `[post_listing, comment_listing]`; only
/// real comments (non-"more" children with a body) survive reshaping.
fn reshape_comments(data: &Value) -> Vec<RedditComment> {
    let Some(children) = data
        .get(1)
        .and_then(|listing| listing.pointer("/data/children"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    children
        .iter()
        .filter(|item| item.get("kind").and_then(Value::as_str) != Some("more"))
        .filter_map(|item| item.get("data"))
        .filter_map(|comment| {
            let body = str_field(comment, "body");
            if body.is_empty() {
                return None;
            }
            Some(RedditComment {
                author: author_field(comment),
                body,
                score: comment.get("score").and_then(Value::as_i64).unwrap_or(0),
                created_utc: comment
                    .get("created_utc")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0),
                permalink: format!("https://reddit.com{}", str_field(comment, "permalink")),
            })
        })
        .take(COMMENTS_PER_POST)
        .collect()
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn author_field(value: &Value) -> String {
    match value.get("author").and_then(Value::as_str) {
        Some(author) if !author.is_empty() => author.to_string(),
        _ => "[deleted]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_subreddit() {
        assert_eq!(normalize_subreddit("wallstreetbets"), "wallstreetbets");
        assert_eq!(normalize_subreddit("r/wallstreetbets"), "wallstreetbets");
        assert_eq!(normalize_subreddit("/r/wallstreetbets"), "wallstreetbets");
        assert_eq!(normalize_subreddit("  r/stocks "), "stocks");
    }

    #[test]
    fn test_clamp_post_count() {
        assert_eq!(clamp_post_count(1), MIN_POSTS);
        assert_eq!(clamp_post_count(10), 10);
        assert_eq!(clamp_post_count(100), MAX_POSTS);
    }

    #[test]
    fn test_reshape_post_link_url_only_for_links() {
        let data = json!({
            "id": "abc",
            "title": "NVDA earnings",
            "author": "trader",
            "selftext": "",
            "permalink": "/r/stocks/comments/abc/nvda/",
            "score": 321,
            "upvote_ratio": 0.93,
            "num_comments": 45,
            "created_utc": 1730000000.0,
            "is_self": false,
            "url": "https://example.com/article",
            "thumbnail": "default",
            "link_flair_text": "Earnings"
        });

        let post = reshape_post(&data, "stocks", Vec::new());
        assert_eq!(post.url, "https://reddit.com/r/stocks/comments/abc/nvda/");
        assert_eq!(post.link_url.as_deref(), Some("https://example.com/article"));
        assert_eq!(post.flair, "Earnings");

        let self_post = reshape_post(&json!({"is_self": true, "url": "x"}), "stocks", Vec::new());
        assert!(self_post.link_url.is_none());
        assert_eq!(self_post.author, "[deleted]");
    }

    #[test]
    fn test_reshape_comments_filters_more_and_empty() {
        let data = json!([
            {"data": {"children": []}},
            {"data": {"children": [
                {"kind": "t1", "data": {
                    "author": "quant", "body": "priced in", "score": 12,
                    "created_utc": 1730000100.0, "permalink": "/r/stocks/comments/abc/c1/"
                }},
                {"kind": "more", "data": {"body": "ignored"}},
                {"kind": "t1", "data": {"author": "bot", "body": ""}}
            ]}}
        ]);

        let comments = reshape_comments(&data);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author, "quant");
        assert_eq!(comments[0].permalink, "https://reddit.com/r/stocks/comments/abc/c1/");
    }

    #[test]
    fn test_reshape_comments_handles_missing_listing() {
        assert!(reshape_comments(&json!([{"data": {}}])).is_empty());
        assert!(reshape_comments(&json!({})).is_empty());
    }
}
