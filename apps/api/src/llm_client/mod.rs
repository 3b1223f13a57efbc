//! LLM Client — the single point of entry for all Gemini API calls.
//!
//! ARCHITECTURAL RULE: No other module may call the Gemini API directly.
//! All model interactions MUST go through this module.
//!
//! One request per analysis: no streaming, no conversation history, no retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::render::RenderedPage;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const IMAGE_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Invalid API key. Please check your Google API key.")]
    InvalidApiKey,

    #[error("API quota exceeded. Please try again later.")]
    QuotaExceeded,

    #[error("API rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("No response text from Gemini API")]
    EmptyResponse,

    #[error("Gemini API call failed: {0}")]
    ApiCallFailed(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::ApiCallFailed(format!("request timed out: {err}"))
        } else {
            LlmError::ApiCallFailed(err.to_string())
        }
    }
}

/// Produces a free-text evaluation of a rendered résumé page.
///
/// Carried in `AppState` as `Arc<dyn VisionModel>`.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn analyze(
        &self,
        instruction: &str,
        job_description: &str,
        page: &RenderedPage,
    ) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(String),
    InlineData(Blob<'a>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, or `None` when it has no visible text.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    reason: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// `VisionModel` backed by the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, api_base: &str) -> Result<Self, reqwest::Error> {
        let endpoint = format!(
            "{}/models/{}:generateContent",
            api_base.trim_end_matches('/'),
            model
        );
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            model,
            endpoint,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.google_api_key.clone(),
            config.gemini_model.clone(),
            &config.gemini_api_base,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn analyze(
        &self,
        instruction: &str,
        job_description: &str,
        page: &RenderedPage,
    ) -> Result<String, LlmError> {
        let request_body = build_request(instruction, job_description, page);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {status}: {body}");
            return Err(classify_api_error(status, &body));
        }

        let body: GenerateContentResponse = response.json().await?;

        if let Some(usage) = &body.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={}, candidate_tokens={}",
                usage.prompt_token_count.unwrap_or_default(),
                usage.candidates_token_count.unwrap_or_default()
            );
        }

        if let Some(reason) = body
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            warn!("Gemini blocked the prompt: {reason}");
            return Err(LlmError::EmptyResponse);
        }

        body.text().ok_or_else(|| {
            let finish_reason = body
                .candidates
                .first()
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("none");
            warn!("Gemini returned no text (finish_reason={finish_reason})");
            LlmError::EmptyResponse
        })
    }
}

fn build_request(
    instruction: &str,
    job_description: &str,
    page: &RenderedPage,
) -> GenerateContentRequest<'static> {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::Text(format!("{instruction}\n\nJob Description: {job_description}")),
                Part::InlineData(Blob {
                    mime_type: IMAGE_MIME_TYPE,
                    data: page.to_base64(),
                }),
            ],
        }],
    }
}

/// Translates a failed Gemini response into an `LlmError`.
///
/// Prefers the structured `error.status` / `error.details[].reason` fields and the
/// HTTP status; the substring checks only catch bodies that lack them.
fn classify_api_error(status: StatusCode, body: &str) -> LlmError {
    let parsed = serde_json::from_str::<GeminiError>(body).ok().map(|e| e.error);

    let (api_status, message, reasons) = match &parsed {
        Some(err) => (
            err.status.as_str(),
            err.message.as_str(),
            err.details
                .iter()
                .filter_map(|d| d.reason.as_deref())
                .collect::<Vec<_>>(),
        ),
        None => ("", body, Vec::new()),
    };
    let haystack = message.to_uppercase();

    if reasons.contains(&"API_KEY_INVALID")
        || status == StatusCode::UNAUTHORIZED
        || haystack.contains("API_KEY")
        || haystack.contains("API KEY")
    {
        return LlmError::InvalidApiKey;
    }

    if haystack.contains("QUOTA") {
        return LlmError::QuotaExceeded;
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || api_status == "RESOURCE_EXHAUSTED"
        || haystack.contains("RATE_LIMIT")
        || haystack.contains("RATE LIMIT")
    {
        return LlmError::RateLimited;
    }

    let detail = if message.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {message}")
    };
    LlmError::ApiCallFailed(detail)
}
