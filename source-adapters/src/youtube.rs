//! YouTube transcript adapter
//!
//! Transcripts come from the SearchAPI.io `youtube_transcripts` engine;
//! the provider returns only the caption track, so the accompanying
//! video info is a stub (derived thumbnail, placeholder title).

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::{AdapterError, Result};
use common::YoutubeConfig;

lazy_static! {
    static ref VIDEO_URL_RE: Regex =
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#/]+)")
            .unwrap();
    static ref BARE_ID_RE: Regex = Regex::new(r"^[a-zA-Z0-9_-]{11}$").unwrap();
}

/// SearchAPI.io transcript client
pub struct TranscriptClient {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
}

/// One caption segment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub duration: f64,
}

/// Stubbed video metadata; the transcript provider does not return it
#[derive(Debug, Clone, Serialize)]
pub struct VideoInfo {
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
    pub duration: u64,
    pub views: u64,
    pub likes: u64,
    pub description: String,
    pub date_posted: String,
}

/// Full transcript response for the facade
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub video_id: String,
    pub video_info: VideoInfo,
    pub transcript: Vec<TranscriptSegment>,
    /// The URL exactly as the user entered it
    pub original_url: String,
}

impl TranscriptClient {
    pub fn new(config: &YoutubeConfig) -> Self {
        Self {
            api_url: config.searchapi_url.clone(),
            api_key: config.api_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the English transcript for a video URL.
    pub async fn fetch_transcript(&self, url: &str) -> Result<Transcript> {
        if self.api_key.is_empty() {
            return Err(AdapterError::NotConfigured(
                "Transcript provider not configured. Set SEARCHAPI_API_KEY.".to_string(),
            ));
        }

        let video_id = extract_video_id(url)?;
        info!("Fetching transcript for video {}", video_id);

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("engine", "youtube_transcripts"),
                ("video_id", video_id.as_str()),
                ("api_key", self.api_key.as_str()),
                ("lang", "en"),
            ])
            .timeout(Duration::from_secs(120))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AdapterError::Timeout(
                        "YouTube transcript service timed out. Please try again later."
                            .to_string(),
                    )
                } else {
                    AdapterError::from_transport(e, "transcript provider")
                }
            })?;

        let status = response.status();
        let data: Value = response.json().await.map_err(|e| AdapterError::Upstream {
            status: status.as_u16(),
            detail: format!("transcript provider returned non-JSON: {e}"),
        })?;

        // The provider reports errors inside a 200 body as often as not
        if let Some(error_msg) = data.get("error").and_then(Value::as_str) {
            return Err(classify_provider_error(error_msg, &data));
        }
        if !status.is_success() {
            return Err(AdapterError::Upstream {
                status: status.as_u16(),
                detail: common::truncate_chars(&data.to_string(), 500).to_string(),
            });
        }

        let segments = parse_segments(&data);
        if segments.is_empty() {
            return Err(no_transcript_error(&data));
        }

        debug!("Got {} transcript segments", segments.len());

        Ok(Transcript {
            video_id: video_id.clone(),
            video_info: stub_video_info(&video_id),
            transcript: segments,
            original_url: url.to_string(),
        })
    }
}

/// Extract the video id from a watch/short/embed URL or a bare id.
pub fn extract_video_id(url: &str) -> Result<String> {
    if let Some(caps) = VIDEO_URL_RE.captures(url) {
        return Ok(caps[1].to_string());
    }
    if BARE_ID_RE.is_match(url) {
        return Ok(url.to_string());
    }
    Err(AdapterError::InvalidInput(
        "Invalid YouTube URL. Could not extract video ID.".to_string(),
    ))
}

fn parse_segments(data: &Value) -> Vec<TranscriptSegment> {
    data.get("transcripts")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    serde_json::from_value::<TranscriptSegment>(item.clone()).ok()
                })
                .map(|mut seg| {
                    seg.text = seg.text.trim().to_string();
                    seg
                })
                .filter(|seg| !seg.text.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn classify_provider_error(error_msg: &str, data: &Value) -> AdapterError {
    let lowered = error_msg.to_lowercase();
    if lowered.contains("quota")
        || lowered.contains("upgrade")
        || lowered.contains("searches for the month")
    {
        return AdapterError::QuotaExceeded(format!(
            "YouTube transcript service quota exceeded. {error_msg}"
        ));
    }

    let languages = available_languages(data, "available_languages");
    if languages.is_empty() {
        AdapterError::InvalidInput(error_msg.to_string())
    } else {
        AdapterError::InvalidInput(format!(
            "{error_msg} Available languages: {}",
            languages.join(", ")
        ))
    }
}

fn no_transcript_error(data: &Value) -> AdapterError {
    let languages = available_languages(data, "available_transcripts_languages");
    if languages.is_empty() {
        AdapterError::NotFound("No transcript available for this video".to_string())
    } else {
        AdapterError::NotFound(format!(
            "No transcript available for this video in the requested language (en). \
             Available languages: {}",
            languages.join(", ")
        ))
    }
}

fn available_languages(data: &Value, key: &str) -> Vec<String> {
    data.get(key)
        .and_then(Value::as_array)
        .map(|langs| {
            langs
                .iter()
                .map(|lang| {
                    let code = lang.get("lang").and_then(Value::as_str).unwrap_or("");
                    let name = lang.get("name").and_then(Value::as_str).unwrap_or(code);
                    format!("{name} ({code})")
                })
                .collect()
        })
        .unwrap_or_default()
}

fn stub_video_info(video_id: &str) -> VideoInfo {
    VideoInfo {
        title: format!("Video {video_id}"),
        channel: "Unknown".to_string(),
        thumbnail: format!("https://img.youtube.com/vi/{video_id}/mqdefault.jpg"),
        duration: 0,
        views: 0,
        likes: 0,
        description: String::new(),
        date_posted: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_video_id_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_extract_video_id_short_and_embed() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_extract_video_id_bare_and_invalid() {
        assert_eq!(extract_video_id("dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
        assert!(extract_video_id("https://example.com/video").is_err());
        assert!(extract_video_id("short").is_err());
    }

    #[test]
    fn test_parse_segments_skips_empty_text() {
        let data = json!({
            "transcripts": [
                {"text": " hello ", "start": 0.0, "duration": 1.5},
                {"text": "   ", "start": 1.5, "duration": 1.0},
                {"text": "world", "start": 2.5, "duration": 2.0}
            ]
        });

        let segments = parse_segments(&data);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello");
        assert!((segments[1].start - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quota_error_detection() {
        let err = classify_provider_error(
            "You have used all your searches for the month.",
            &json!({}),
        );
        assert!(matches!(err, AdapterError::QuotaExceeded(_)));
    }

    #[test]
    fn test_language_error_enumerates_languages() {
        let data = json!({
            "available_languages": [
                {"lang": "de", "name": "German"},
                {"lang": "fr", "name": "French"}
            ]
        });
        let err = classify_provider_error("No transcript in requested language", &data);
        match err {
            AdapterError::InvalidInput(msg) => {
                assert!(msg.contains("German (de)"));
                assert!(msg.contains("French (fr)"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_transcript_error_mentions_alternatives() {
        let data = json!({
            "available_transcripts_languages": [{"lang": "es", "name": "Spanish"}]
        });
        match no_transcript_error(&data) {
            AdapterError::NotFound(msg) => assert!(msg.contains("Spanish (es)")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
