/// LLM Client: the single point of entry for all model calls.
///
/// No other module talks to the inference API directly. Callers go through the
/// `InferenceClient` trait; in production that is a `ProviderChain` of `LlmProvider`s,
/// one per configured model, tried in order.
///
/// Each provider makes exactly one HTTP attempt per call. Retrying is the caller's
/// job (see `analysis::retry`), so errors carry a retryable classification plus a
/// "try the next model" vs "abort" decision for the chain.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::retry::{Retryable, StepError};

pub mod prompts;

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODELS: &[&str] = &["claude-sonnet-4-5", "claude-haiku-4-5"];
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Competitiveness,
    SchoolRecommendations,
    CaseAnalysis,
    ImprovementPlan,
    ResearchScore,
    InternshipScore,
}

impl PromptKind {
    pub fn name(self) -> &'static str {
        match self {
            PromptKind::Competitiveness => "competitiveness",
            PromptKind::SchoolRecommendations => "school_recommendations",
            PromptKind::CaseAnalysis => "case_analysis",
            PromptKind::ImprovementPlan => "improvement_plan",
            PromptKind::ResearchScore => "research_score",
            PromptKind::InternshipScore => "internship_score",
        }
    }

    /// Score prompts answer in plain text; everything else answers with a JSON object.
    pub fn expects_json(self) -> bool {
        !matches!(self, PromptKind::ResearchScore | PromptKind::InternshipScore)
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed model output: {0}")]
    Malformed(String),

    #[error("model returned empty content")]
    EmptyContent,

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("no inference provider configured")]
    NoProviders,
}

/// What a provider chain does after one provider fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Next,
    Abort,
}

impl InferenceError {
    pub fn fallback(&self) -> Fallback {
        match self {
            InferenceError::Timeout
            | InferenceError::Network(_)
            | InferenceError::Malformed(_)
            | InferenceError::EmptyContent => Fallback::Next,
            InferenceError::Api { status, .. } if *status == 429 || *status >= 500 => {
                Fallback::Next
            }
            InferenceError::Api { .. }
            | InferenceError::ClientBuild(_)
            | InferenceError::NoProviders => Fallback::Abort,
        }
    }
}

impl Retryable for InferenceError {
    fn is_retryable(&self) -> bool {
        match self {
            InferenceError::Timeout | InferenceError::Network(_) => true,
            InferenceError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceError::Timeout
        } else {
            InferenceError::Network(e.to_string())
        }
    }
}

impl From<InferenceError> for StepError {
    fn from(e: InferenceError) -> Self {
        if e.is_retryable() {
            StepError::Retryable(e.to_string())
        } else {
            StepError::Fatal(e.to_string())
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client seam
// ────────────────────────────────────────────────────────────────────────────

/// One structured inference call. JSON prompt kinds return a JSON object; score
/// kinds return the raw answer as a JSON string.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, kind: PromptKind, input: &Value) -> Result<Value, InferenceError>;

    fn name(&self) -> String;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic Messages provider
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// One model behind one HTTP endpoint.
#[derive(Clone)]
pub struct LlmProvider {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl LlmProvider {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Single request; returns the text of the first text block.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, InferenceError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Malformed(e.to_string()))?;
        if let Some(usage) = &parsed.usage {
            debug!(
                model = %self.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "model call succeeded"
            );
        }

        parsed
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(InferenceError::EmptyContent)
    }
}

#[async_trait]
impl InferenceClient for LlmProvider {
    async fn generate(&self, kind: PromptKind, input: &Value) -> Result<Value, InferenceError> {
        let prompt = prompts::render(kind, input);
        let text = self.complete(prompts::system_prompt(kind), &prompt).await?;
        parse_output(kind, &text)
    }

    fn name(&self) -> String {
        self.model.clone()
    }
}

fn parse_output(kind: PromptKind, text: &str) -> Result<Value, InferenceError> {
    if kind.expects_json() {
        extract_json(text)
    } else {
        Ok(Value::String(text.trim().to_string()))
    }
}

/// Parses a JSON object out of model text: fenced, bare, or embedded in prose.
fn extract_json(text: &str) -> Result<Value, InferenceError> {
    let cleaned = strip_json_fences(text);
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(cleaned) {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(InferenceError::Malformed(format!(
        "no JSON object in response ({} chars)",
        text.len()
    )))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let rest = rest.trim_start();
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}

// ────────────────────────────────────────────────────────────────────────────
// Provider chain
// ────────────────────────────────────────────────────────────────────────────

/// Ordered model fallback behind one `InferenceClient`.
pub struct ProviderChain {
    providers: Vec<Arc<dyn InferenceClient>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn InferenceClient>>) -> Self {
        Self { providers }
    }

    /// One `LlmProvider` per model, in order.
    pub fn from_models(api_url: &str, api_key: &str, models: &[String]) -> Result<Self, InferenceError> {
        let providers = models
            .iter()
            .map(|model| {
                LlmProvider::new(api_url, api_key, model.as_str())
                    .map(|p| Arc::new(p) as Arc<dyn InferenceClient>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(providers))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

}

#[async_trait]
impl InferenceClient for ProviderChain {
    async fn generate(&self, kind: PromptKind, input: &Value) -> Result<Value, InferenceError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.generate(kind, input).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(provider = %provider.name(), %kind, "provider failed: {e}");
                    if e.fallback() == Fallback::Abort {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(InferenceError::NoProviders))
    }

    fn name(&self) -> String {
        let names: Vec<String> = self.providers.iter().map(|p| p.name()).collect();
        format!("chain[{}]", names.join(","))
    }
}
