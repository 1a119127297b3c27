//! Markdown report formatters
//!
//! Agent results are flattened into markdown before they go to the
//! vector-bucket sink. Each report is capped so a noisy source cannot
//! flood the classifier: 50 posts for Twitter, 30 for Reddit, 20 events
//! for Polymarket.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use common::{group_thousands, truncate_chars};
use source_adapters::reddit::RedditPost;
use source_adapters::twitter::XPost;

const TWITTER_REPORT_POSTS: usize = 50;
const REDDIT_REPORT_POSTS: usize = 30;
const POLYMARKET_REPORT_EVENTS: usize = 20;

/// Twitter analysis -> markdown report
pub fn twitter_report(
    topic: &str,
    timeframe_weeks: u32,
    handles: &[String],
    posts: &[XPost],
    generated_at: DateTime<FixedOffset>,
) -> String {
    let timeframe = if timeframe_weeks == 1 {
        "1 week".to_string()
    } else {
        format!("{timeframe_weeks} weeks")
    };

    let mut md = String::from("# Twitter Analysis Report\n\n");
    md.push_str(&format!("**Generated:** {}\n\n", generated_at.to_rfc3339()));
    md.push_str(&format!("**Topic:** {topic}\n\n"));
    md.push_str(&format!("**Timeframe:** {timeframe}\n\n"));
    md.push_str(&format!("**Accounts Analyzed:** {}\n\n", handles.len()));
    md.push_str(&format!("**Total Posts Found:** {}\n\n", posts.len()));
    md.push_str("---\n\n");

    let mut sorted: Vec<&XPost> = posts.iter().collect();
    sorted.sort_by(|a, b| b.views.cmp(&a.views));

    for (i, post) in sorted.iter().take(TWITTER_REPORT_POSTS).enumerate() {
        md.push_str(&format!("### {}. @{}\n\n", i + 1, post.author));
        md.push_str(&format!("**URL:** {}\n\n", post.url));
        if !post.text.is_empty() {
            md.push_str(&format!(
                "**Content:**\n> {}\n\n",
                truncate_chars(&post.text, 500)
            ));
        }

        let mut stats = Vec::new();
        if post.views > 0 {
            stats.push(format!("{} views", group_thousands(post.views)));
        }
        if post.likes > 0 {
            stats.push(format!("{} likes", group_thousands(post.likes)));
        }
        if post.retweets > 0 {
            stats.push(format!("{} retweets", group_thousands(post.retweets)));
        }
        if !stats.is_empty() {
            md.push_str(&format!("**Stats:** {}\n\n", stats.join(" | ")));
        }
        md.push_str("---\n\n");
    }

    md
}

/// Reddit analysis -> markdown report
pub fn reddit_report(
    subreddit: &str,
    posts: &[RedditPost],
    generated_at: DateTime<FixedOffset>,
) -> String {
    let mut md = format!("# Reddit Analysis Report: r/{subreddit}\n\n");
    md.push_str(&format!("**Generated:** {}\n\n", generated_at.to_rfc3339()));
    md.push_str(&format!("**Subreddit:** r/{subreddit}\n\n"));
    md.push_str(&format!("**Posts Analyzed:** {}\n\n", posts.len()));
    md.push_str("---\n\n");

    let mut sorted: Vec<&RedditPost> = posts.iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));

    for (i, post) in sorted.iter().take(REDDIT_REPORT_POSTS).enumerate() {
        md.push_str(&format!("### {}. {}\n\n", i + 1, post.title));
        md.push_str(&format!("**URL:** {}\n\n", post.url));
        md.push_str(&format!("**Author:** u/{}\n\n", post.author));
        md.push_str(&format!(
            "**Score:** {} | **Comments:** {}\n\n",
            group_thousands(post.score.max(0) as u64),
            group_thousands(post.num_comments)
        ));
        if !post.selftext.is_empty() {
            md.push_str(&format!(
                "**Content:**\n> {}\n\n",
                truncate_chars(&post.selftext, 500)
            ));
        }
        md.push_str("---\n\n");
    }

    md
}

/// Polymarket search -> markdown report
pub fn polymarket_report(
    keyword: &str,
    events: &[Value],
    generated_at: DateTime<FixedOffset>,
) -> String {
    let mut md = String::from("# Polymarket Search Results\n\n");
    md.push_str(&format!("**Generated:** {}\n\n", generated_at.to_rfc3339()));
    md.push_str(&format!("**Search Keyword:** {keyword}\n\n"));
    md.push_str(&format!("**Markets Found:** {}\n\n", events.len()));
    md.push_str("---\n\n");

    for (i, event) in events.iter().take(POLYMARKET_REPORT_EVENTS).enumerate() {
        let title = event
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        let slug = event.get("slug").and_then(Value::as_str).unwrap_or("N/A");

        md.push_str(&format!("## {}. {}\n\n", i + 1, title));
        md.push_str(&format!("**Slug:** `{slug}`\n\n"));
        md.push_str(&format!(
            "**Volume:** ${}\n\n",
            group_thousands(numeric_field(event, "volume") as u64)
        ));
        md.push_str(&format!(
            "**Liquidity:** ${}\n\n",
            group_thousands(numeric_field(event, "liquidity") as u64)
        ));
        md.push_str(&format!(
            "**URL:** https://polymarket.com/event/{slug}\n\n"
        ));
        if let Some(description) = event.get("description").and_then(Value::as_str) {
            if !description.is_empty() {
                md.push_str(&format!(
                    "**Description:**\n{}\n\n",
                    truncate_chars(description, 500)
                ));
            }
        }
        md.push_str("---\n\n");
    }

    md
}

/// Gamma reports numbers both as JSON numbers and as strings.
fn numeric_field(value: &Value, key: &str) -> f64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 12, 8, 7, 30, 0)
            .unwrap()
    }

    fn post(author: &str, views: u64) -> XPost {
        XPost {
            url: format!("https://x.com/{author}/status/1"),
            author: author.to_string(),
            text: "GPU capex keeps climbing".to_string(),
            views,
            likes: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_twitter_report_sorts_and_caps() {
        let posts: Vec<XPost> = (0..60).map(|i| post(&format!("user{i}"), i as u64)).collect();
        let handles = vec!["user1".to_string()];

        let md = twitter_report("AI capex", 2, &handles, &posts, at());

        assert!(md.starts_with("# Twitter Analysis Report"));
        assert!(md.contains("**Timeframe:** 2 weeks"));
        assert!(md.contains("**Total Posts Found:** 60"));
        // highest-view post leads
        assert!(md.contains("### 1. @user59"));
        // capped at 50 entries
        assert!(md.contains("### 50."));
        assert!(!md.contains("### 51."));
    }

    #[test]
    fn test_twitter_report_singular_week() {
        let md = twitter_report("AI", 1, &[], &[], at());
        assert!(md.contains("**Timeframe:** 1 week"));
    }

    #[test]
    fn test_reddit_report_structure() {
        let posts = vec![RedditPost {
            id: "abc".to_string(),
            title: "NVDA earnings".to_string(),
            author: "trader".to_string(),
            selftext: "thoughts?".to_string(),
            url: "https://reddit.com/r/stocks/comments/abc/".to_string(),
            score: 1234,
            upvote_ratio: 0.9,
            num_comments: 56,
            created_utc: 0.0,
            subreddit: "stocks".to_string(),
            is_self: true,
            link_url: None,
            thumbnail: String::new(),
            flair: String::new(),
            comments: Vec::new(),
        }];

        let md = reddit_report("stocks", &posts, at());
        assert!(md.contains("# Reddit Analysis Report: r/stocks"));
        assert!(md.contains("**Score:** 1,234 | **Comments:** 56"));
        assert!(md.contains("u/trader"));
    }

    #[test]
    fn test_polymarket_report_handles_string_numbers() {
        let events = vec![json!({
            "title": "Fed decision",
            "slug": "fed-decision",
            "volume": "1234567.89",
            "liquidity": 50000,
            "description": "Will the Fed cut rates?"
        })];

        let md = polymarket_report("fed", &events, at());
        assert!(md.contains("## 1. Fed decision"));
        assert!(md.contains("**Volume:** $1,234,567"));
        assert!(md.contains("**Liquidity:** $50,000"));
        assert!(md.contains("https://polymarket.com/event/fed-decision"));
    }

    #[test]
    fn test_polymarket_report_caps_events() {
        let events: Vec<Value> = (0..30)
            .map(|i| json!({"title": format!("E{i}"), "slug": format!("e{i}")}))
            .collect();
        let md = polymarket_report("x", &events, at());
        assert!(md.contains("## 20."));
        assert!(!md.contains("## 21."));
    }
}
