// Gemini REST client.
//
// Posts to `{endpoint}/v1beta/models/{model}:generateContent` and returns the
// decoded response. The rest of the crate talks to the `GenerativeModel`
// trait, so tests run against canned responses and no process-wide client
// exists.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use xb2bx_core::config::Config;

use crate::wire::{
    Content, GenerateContentBody, GenerateResponse, GenerationConfig, GoogleSearch, ImageConfig,
    Tool,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("AI features are not configured (no API key)")]
    NotConfigured,

    #[error("network error: {0}")]
    Transport(String),

    #[error("AI provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode AI response: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One single-turn generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub system_instruction: Option<String>,
    /// Enable web-search grounding.
    pub google_search: bool,
    /// Request an image with this aspect ratio (e.g. `16:9`).
    pub aspect_ratio: Option<String>,
}

impl GenerateRequest {
    pub fn new(model: &str, prompt: impl Into<String>) -> Self {
        Self {
            model: model.to_string(),
            prompt: prompt.into(),
            system_instruction: None,
            google_search: false,
            aspect_ratio: None,
        }
    }

    pub fn system(mut self, instruction: &str) -> Self {
        self.system_instruction = Some(instruction.to_string());
        self
    }

    pub fn with_search(mut self) -> Self {
        self.google_search = true;
        self
    }

    pub fn aspect_ratio(mut self, ratio: &str) -> Self {
        self.aspect_ratio = Some(ratio.to_string());
        self
    }

    /// Wire body for `generateContent`.
    pub fn to_body(&self) -> GenerateContentBody {
        GenerateContentBody {
            contents: vec![Content::user_text(&self.prompt)],
            system_instruction: self.system_instruction.as_deref().map(Content::system_text),
            tools: if self.google_search {
                vec![Tool {
                    google_search: GoogleSearch {},
                }]
            } else {
                vec![]
            },
            generation_config: self.aspect_ratio.as_ref().map(|ratio| GenerationConfig {
                image_config: ImageConfig {
                    aspect_ratio: ratio.clone(),
                },
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// GenerativeModel port
// ---------------------------------------------------------------------------

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError>;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String, endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let url = self.url_for(&request.model);
        debug!(model = %request.model, search = request.google_search, "generateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request.to_body())
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = extract_error_message(&body);
            warn!(status = status.as_u16(), "AI provider error: {}", message);
            return Err(LlmError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))
    }
}

/// Pull `error.message` out of a Google API error body, falling back to the
/// raw body.
pub(crate) fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.trim().to_string())
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// Either a live Gemini client or a stand-in that fails every call.
pub enum LlmClient {
    /// API key configured.
    Active(GeminiClient),
    /// No API key: every call returns `LlmError::NotConfigured`.
    Disabled,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> Self {
        match config.gemini_api_key() {
            Some(key) => LlmClient::Active(GeminiClient::new(key.to_string(), &config.llm.endpoint)),
            None => LlmClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }
}

#[async_trait]
impl GenerativeModel for LlmClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        match self {
            LlmClient::Active(client) => client.generate(request).await,
            LlmClient::Disabled => Err(LlmError::NotConfigured),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
