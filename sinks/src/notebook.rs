//! Notebook router sink
//!
//! Classifies free text into investment-theme notebooks with an LLM call
//! through the l2m2 gateway, then pushes the content to each selected
//! notebook via the Discovery Engine source API. Callers may also pin
//! explicit notebook ids and skip classification entirely.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Result, SinkError};
use common::{clean_for_sink, truncate_chars, NotebookConfig};

/// Classification input is capped at this many characters
const CLASSIFY_MAX_CHARS: usize = 8000;

/// Routing prompt for the classification model. The themes mirror the
/// notebook registry in the configuration.
const CLASSIFICATION_PROMPT: &str = r#"You are an AI content router for an investor's NotebookLM workspace.

Your job:

Given a user-supplied passage (a paragraph, article excerpt, memo, or transcript), decide which of the following investment-theme notebooks it belongs in.

General rules:

- You MAY assign a passage to multiple notebooks if it clearly fits more than one theme.

- Most passages should have 1-3 notebooks, not all of them.

- If no notebook is a clear fit, return an empty list.

- Focus on the underlying INVESTMENT THEME, not just surface keywords.

- When torn between two themes, choose the one that best explains the *core* thesis of the passage, and only add a second notebook if that theme is truly central.

Available notebooks and themes:

1) "V2 - AI Infrastructure: Compute, Chips & Energy"

   - Theme: Owning the physical and capital-intensive stack that powers AI: chips, data centers, networking, and energy.

   - Strong cues: "Nvidia", "HBM", "GPU cluster", "TPU", "data center", "capex arms race", "energy bottleneck", "nuclear", "hyperscalers".

2) "V2 - Agentic Labor & Vibe Coding: The $10T Labor Arbitrage"

   - Theme: AI agents and "liquid software" that replace or radically augment human labor, especially in coding and enterprise workflows.

   - Strong cues: "agents", "agentic", "vibe coding", "liquid software", "AI SDR", "AI support", "Cursor", "Replit", "Devin", "Copilot", "OpenHands".

3) "V2 - Venture Metrics, Fund Strategy & Liquidity"

   - Theme: How to price, fund, and structure AI companies and funds in a world where classic SaaS metrics break down.

   - Strong cues: "gross margin", "gross profit dollars", "burn multiple", "entry price", "outcome size", "fund size", "mega fund", "secondary market", "liquidity", "retail investors".

4) "V2 - Incumbents vs. The Disruptors: AI Competition & GTM"

   - Theme: Competitive dynamics and game theory between established tech giants and AI-native startups.

   - Strong cues: "incumbent vs startup", "disruptor", "war mode", "game theory", "distribution", "go-to-market", "Harvey", "Sierra", "Intercom", "Brave".

5) "V2 - Geopolitics, China & Sovereign AI ("Red Stack")"

   - Theme: Nation-state AI strategies, export controls, and the bifurcation of US vs Chinese AI ecosystems.

   - Strong cues: "China", "Chinese", "Beijing", "ByteDance", "Alibaba", "Huawei", "Ascend", "Cambricon", "Red Stack", "export controls", "sovereign AI".

6) "V2 - The Frontier Model Race & Public–Private Fusion"

   - Theme: The capital-intensive race to build frontier models and the emerging fusion of state and private labs.

   - Strong cues: "frontier model", "Gemini 3", "GPT-4/5", "xAI", "pretraining", "post-training", "RLHF", "national labs", "AI Manhattan Project", "220M paying subscribers".

Conflict resolution and multi-tagging:

- Start by asking: "What is the MAIN question or investment thesis of this passage?"

- Assign that theme as the first notebook.

- Only add a second or third notebook if that theme is genuinely co-equal (e.g., Chinese export controls on chips -> BOTH Geopolitics/China AND AI Infrastructure).

- Do NOT assign more than three notebooks for any single passage.

Output format:

- Return ONLY a JSON array of notebook titles you select, sorted by most to least relevant.

- Example:

  ["V2 - AI Infrastructure: Compute, Chips & Energy", "V2 - Geopolitics, China & Sovereign AI (\"Red Stack\")"]

---

PASSAGE TO CLASSIFY:

"#;

/// LLM-routing sink client
pub struct NotebookRouter {
    config: NotebookConfig,
    client: reqwest::Client,
}

/// Inbound add-source request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRequest {
    pub source_name: String,
    pub content: String,
    /// "text", "web" or "youtube"
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Pin explicit notebook ids instead of classifying
    #[serde(default)]
    pub notebook_ids: Option<Vec<String>>,
}

fn default_content_type() -> String {
    "text".to_string()
}

/// Per-notebook push outcome
#[derive(Debug, Clone, Serialize)]
pub struct NotebookResult {
    pub success: bool,
    pub notebook: String,
    pub notebook_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full routing outcome for the facade
#[derive(Debug, Clone, Serialize)]
pub struct RouteOutcome {
    pub success: bool,
    pub message: String,
    pub classified_notebooks: Vec<String>,
    pub notebook_mapping: BTreeMap<String, String>,
    pub results: Vec<NotebookResult>,
}

#[derive(Debug, Deserialize)]
struct LlmResponse {
    #[serde(default)]
    output_text: String,
}

impl NotebookRouter {
    pub fn new(config: &NotebookConfig) -> Self {
        Self {
            config: config.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Notebook registry: (name, id) pairs in stable order.
    pub fn notebooks(&self) -> Vec<(String, String)> {
        self.config
            .notebooks
            .iter()
            .map(|(name, id)| (name.clone(), id.clone()))
            .collect()
    }

    /// Configuration status for the facade, with the project number
    /// redacted down to a prefix.
    pub fn config_status(&self) -> Value {
        let configured = !self.config.project_number.is_empty();
        let project_number = configured
            .then(|| format!("{}...", truncate_chars(&self.config.project_number, 4)));
        serde_json::json!({
            "configured": configured,
            "project_number": project_number,
            "location": self.config.location,
            "endpoint_location": self.config.endpoint_location,
        })
    }

    /// Ask the routing model which notebooks a passage belongs in.
    /// Classification failures are soft: they produce an empty list.
    pub async fn classify(&self, content: &str) -> Vec<String> {
        let cleaned = clean_for_sink(content);
        let truncated = truncate_chars(&cleaned, CLASSIFY_MAX_CHARS);
        let prompt = format!(
            "{CLASSIFICATION_PROMPT}{truncated}\n\nIMPORTANT: Respond ONLY with a JSON array of notebook titles. No other text."
        );

        debug!("Classifying {} chars of content", truncated.chars().count());

        let payload = serde_json::json!({
            "model": self.config.model,
            "input": prompt,
            "temperature": 0.1,
        });

        let response = self
            .client
            .post(format!("{}/responses", self.config.l2m2_base_url))
            .bearer_auth(&self.config.l2m2_api_key)
            .json(&payload)
            .timeout(Duration::from_secs(60))
            .send()
            .await;

        let completion = match response {
            Ok(response) if response.status().is_success() => {
                match response.json::<LlmResponse>().await {
                    Ok(parsed) => parsed.output_text,
                    Err(e) => {
                        warn!("Classification response unreadable: {}", e);
                        return Vec::new();
                    }
                }
            }
            Ok(response) => {
                warn!("Classification call failed: {}", response.status());
                return Vec::new();
            }
            Err(e) => {
                warn!("Classification call failed: {}", e);
                return Vec::new();
            }
        };

        let notebooks = parse_notebook_list(&completion);
        info!("Classified into {} notebook(s)", notebooks.len());
        notebooks
    }

    /// Route content to notebooks, classifying unless explicit ids were
    /// pinned by the caller.
    pub async fn add_source(&self, request: &SourceRequest) -> Result<RouteOutcome> {
        if self.config.project_number.is_empty() {
            return Err(SinkError::NotConfigured(
                "Notebook routing not configured. Set notebook.project_number.".to_string(),
            ));
        }
        if matches!(request.content_type.as_str(), "web" | "youtube") && request.url.is_none() {
            return Err(SinkError::InvalidInput(format!(
                "URL required for {} content",
                request.content_type
            )));
        }

        let selected = match &request.notebook_ids {
            Some(ids) if !ids.is_empty() => {
                let id_to_name: BTreeMap<&String, &String> =
                    self.config.notebooks.iter().map(|(k, v)| (v, k)).collect();
                let mut names = Vec::new();
                for id in ids {
                    match id_to_name.get(id) {
                        Some(name) => names.push((*name).clone()),
                        None => warn!("Unknown notebook id: {}", id),
                    }
                }
                names
            }
            _ => self.classify(&request.content).await,
        };

        if selected.is_empty() {
            return Ok(RouteOutcome {
                success: false,
                message: "Content did not match any investment-theme notebooks".to_string(),
                classified_notebooks: Vec::new(),
                notebook_mapping: BTreeMap::new(),
                results: Vec::new(),
            });
        }

        let mut results = Vec::new();
        let mut success_count = 0usize;
        for name in &selected {
            let result = match self.config.notebooks.get(name) {
                Some(id) => self.push_to_notebook(id, name, request).await,
                None => {
                    warn!("Unknown notebook name: {}", name);
                    NotebookResult {
                        success: false,
                        notebook: name.clone(),
                        notebook_id: None,
                        error: Some("Notebook not found in configuration".to_string()),
                    }
                }
            };
            if result.success {
                success_count += 1;
            }
            results.push(result);
        }

        info!(
            "Notebook routing complete: {}/{} notebooks updated",
            success_count,
            selected.len()
        );

        let notebook_mapping = selected
            .iter()
            .filter_map(|name| {
                self.config
                    .notebooks
                    .get(name)
                    .map(|id| (name.clone(), id.clone()))
            })
            .collect();

        Ok(RouteOutcome {
            success: success_count > 0,
            message: format!(
                "Source added to {}/{} notebooks",
                success_count,
                selected.len()
            ),
            classified_notebooks: selected,
            notebook_mapping,
            results,
        })
    }

    async fn push_to_notebook(
        &self,
        notebook_id: &str,
        notebook_name: &str,
        request: &SourceRequest,
    ) -> NotebookResult {
        let api_url = format!(
            "https://{}discoveryengine.googleapis.com/v1alpha/projects/{}/locations/{}/notebooks/{}/sources:batchCreate",
            self.config.endpoint_location,
            self.config.project_number,
            self.config.location,
            notebook_id,
        );

        let payload = match source_payload(request) {
            Ok(payload) => payload,
            Err(e) => {
                return NotebookResult {
                    success: false,
                    notebook: notebook_name.to_string(),
                    notebook_id: Some(notebook_id.to_string()),
                    error: Some(e.to_string()),
                }
            }
        };

        debug!("Adding source '{}' to {}", request.source_name, notebook_name);

        let response = self
            .client
            .post(&api_url)
            .bearer_auth(&self.config.access_token)
            .json(&payload)
            .timeout(Duration::from_secs(60))
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!("Source added to {}", notebook_name);
                NotebookResult {
                    success: true,
                    notebook: notebook_name.to_string(),
                    notebook_id: Some(notebook_id.to_string()),
                    error: None,
                }
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!("Notebook push to {} failed: {}", notebook_name, status);
                NotebookResult {
                    success: false,
                    notebook: notebook_name.to_string(),
                    notebook_id: Some(notebook_id.to_string()),
                    error: Some(truncate_chars(&body, 500).to_string()),
                }
            }
            Err(e) => {
                warn!("Notebook push to {} failed: {}", notebook_name, e);
                NotebookResult {
                    success: false,
                    notebook: notebook_name.to_string(),
                    notebook_id: Some(notebook_id.to_string()),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Build the `sources:batchCreate` body for a request. YouTube URLs also
/// travel as web content; the video-specific field is not accepted.
fn source_payload(request: &SourceRequest) -> Result<Value> {
    let user_content = match request.content_type.as_str() {
        "text" => serde_json::json!({
            "textContent": {
                "sourceName": request.source_name,
                "content": request.content,
            }
        }),
        "web" | "youtube" => serde_json::json!({
            "webContent": {
                "url": request.url,
                "sourceName": request.source_name,
            }
        }),
        other => {
            return Err(SinkError::InvalidInput(format!(
                "Unknown content type: {other}"
            )))
        }
    };

    Ok(serde_json::json!({ "userContents": [user_content] }))
}

/// Parse the model reply into notebook titles: strip markdown code
/// fences, then expect a JSON array of strings.
fn parse_notebook_list(completion: &str) -> Vec<String> {
    let cleaned = completion.trim();

    if cleaned.starts_with("```") {
        let mut lines: Vec<&str> = cleaned.lines().collect();
        if !lines.is_empty() {
            lines.remove(0);
        }
        if lines.last().map(|l| l.trim() == "```").unwrap_or(false) {
            lines.pop();
        }
        return parse_notebook_list_inner(&lines.join("\n"));
    }

    parse_notebook_list_inner(cleaned)
}

fn parse_notebook_list_inner(cleaned: &str) -> Vec<String> {
    match serde_json::from_str::<Value>(cleaned.trim()) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        Ok(_) => {
            warn!("Unexpected classification response shape");
            Vec::new()
        }
        Err(e) => {
            warn!("Failed to parse classification response as JSON: {}", e);
            Vec::new()
        }
    }
}
