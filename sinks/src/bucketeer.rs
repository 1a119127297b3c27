//! Bucketeer sink
//!
//! The vector-bucket store classifies submitted text on its side via
//! embeddings; this client only has to deliver clean content and survive
//! the service's slow cold paths, hence the generous timeout and the
//! exponential-backoff retry on transport failures.

use chrono::Local;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{Result, SinkError};
use common::{clean_for_sink, truncate_chars, BucketeerConfig};

/// Stored-content acknowledgment
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct StoredContent {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub buckets: Vec<Value>,
}

/// Vector-bucket store client
pub struct BucketeerClient {
    config: BucketeerConfig,
    client: reqwest::Client,
}

impl BucketeerClient {
    pub fn new(config: &BucketeerConfig) -> Self {
        Self {
            config: config.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Submit free text for bucket classification and storage.
    pub async fn add_content(&self, content: &str) -> Result<StoredContent> {
        if content.trim().is_empty() {
            return Err(SinkError::InvalidInput(
                "Content cannot be empty".to_string(),
            ));
        }

        let cleaned = clean_for_sink(content);
        info!(
            "Submitting {} chars to Bucketeer ({} after cleaning)",
            content.chars().count(),
            cleaned.chars().count()
        );

        let payload = serde_json::json!({
            "content": cleaned,
            "published_on": Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        });

        let endpoint = endpoint_url(&self.config.base_url);
        let mut last_error: Option<SinkError> = None;

        for attempt in 0..self.config.max_retries {
            match self.post_once(&endpoint, &payload).await {
                Ok(stored) => return Ok(stored),
                // only transport-level failures are worth retrying
                Err(SinkError::Timeout(msg)) => {
                    last_error = Some(SinkError::Timeout(msg));
                    if attempt + 1 < self.config.max_retries {
                        let wait = self.config.retry_delay_secs * (1u64 << attempt);
                        warn!(
                            "Bucketeer attempt {}/{} failed, retrying in {}s",
                            attempt + 1,
                            self.config.max_retries,
                            wait
                        );
                        sleep(Duration::from_secs(wait)).await;
                    }
                }
                Err(other) => return Err(other),
            }
        }

        Err(SinkError::Timeout(format!(
            "Bucketeer API timeout after {} attempts: {}",
            self.config.max_retries,
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string())
        )))
    }

    async fn post_once(&self, endpoint: &str, payload: &Value) -> Result<StoredContent> {
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    SinkError::Timeout(format!("Bucketeer transport error: {e}"))
                } else {
                    SinkError::Http(e)
                }
            })?;

        let status = response.status();
        if status.as_u16() == 201 {
            let stored: StoredContent = response.json().await.map_err(|e| SinkError::Upstream {
                status: 201,
                detail: format!("Bucketeer returned non-JSON response: {e}"),
            })?;
            info!(
                "Content stored, id: {}, buckets: {}",
                stored
                    .id
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                stored.buckets.len()
            );
            Ok(stored)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SinkError::Upstream {
                status: status.as_u16(),
                detail: format!(
                    "Bucketeer API error ({}): {}",
                    status.as_u16(),
                    truncate_chars(&body, 200)
                ),
            })
        }
    }
}

/// Join the configured base URL with the content endpoint, tolerating a
/// trailing slash either way.
fn endpoint_url(base_url: &str) -> String {
    format!("{}/api/v1/content/", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_join() {
        assert_eq!(
            endpoint_url("https://bucketeer.example.com/"),
            "https://bucketeer.example.com/api/v1/content/"
        );
        assert_eq!(
            endpoint_url("https://bucketeer.example.com"),
            "https://bucketeer.example.com/api/v1/content/"
        );
    }

    #[test]
    fn test_stored_content_parsing() {
        let json = r#"{"id": 42, "buckets": ["ai-infra", "geopolitics"]}"#;
        let stored: StoredContent = serde_json::from_str(json).unwrap();
        assert_eq!(stored.id, Some(serde_json::json!(42)));
        assert_eq!(stored.buckets.len(), 2);

        let bare: StoredContent = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert!(bare.buckets.is_empty());
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let client = BucketeerClient::new(&BucketeerConfig::default());
        let err = client.add_content("   ").await.unwrap_err();
        assert!(matches!(err, SinkError::InvalidInput(_)));
    }
}
