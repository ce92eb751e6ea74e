//! Text generation through the hosted language-model service.
//!
//! The gateway sends one fully composed input per call to the Responses API and reads back
//! the generated text. Nothing is streamed and nothing is retried.

use crate::config::{Config, normalize_base_url};
use crate::upstream::{build_http_client, format_endpoint, read_failure};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const USER_AGENT: &str = "ragbridge/generation";
const ERROR_POINTER: &str = "/error/message";

/// Errors surfaced while generating text.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid generation service URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service responded with a non-success status.
    #[error("Generation service returned {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Message extracted from the response body.
        message: String,
    },
    /// Response could not be interpreted.
    #[error("Malformed generation response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Upstream status, when the service answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for handing back to the browser unchanged.
    pub fn upstream_message(&self) -> String {
        match self {
            Self::UnexpectedStatus { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Request payload for a single completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Model identifier understood by the service.
    pub model: String,
    /// Composed prompt.
    pub input: String,
}

/// Interface implemented by text generation backends.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate text for the composed input.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Client for the OpenAI Responses API.
pub struct OpenAiResponsesClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiResponsesClient {
    /// Construct a client for `base_url` authenticated with `api_key`.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, GenerationError> {
        let http = build_http_client(USER_AGENT, timeout_secs)?;
        let base_url = normalize_base_url(base_url).map_err(GenerationError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized generation HTTP client");
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Build a client from configuration, or `None` when no credential is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, GenerationError> {
        config
            .openai_api_key
            .as_deref()
            .map(|key| Self::new(&config.openai_api_base, key, config.upstream_timeout_secs))
            .transpose()
    }

    fn endpoint(&self) -> String {
        format_endpoint(&self.base_url, "responses")
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesBody {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesBody {
    /// Top-level `output_text` when present, else every `output_text` content item joined.
    fn into_text(self) -> Option<String> {
        if let Some(text) = self.output_text {
            return Some(text);
        }

        let pieces: Vec<String> = self
            .output
            .into_iter()
            .flat_map(|item| item.content)
            .filter(|content| content.kind == "output_text")
            .filter_map(|content| content.text)
            .collect();

        if pieces.is_empty() {
            None
        } else {
            Some(pieces.concat())
        }
    }
}

#[async_trait]
impl GenerationClient for OpenAiResponsesClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        tracing::debug!(model = %request.model, input_chars = request.input.len(), "Requesting generation");
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = read_failure(response, ERROR_POINTER).await;
            let error = GenerationError::UnexpectedStatus { status, message };
            tracing::error!(model = %request.model, error = %error, "Generation request failed");
            return Err(error);
        }

        let body: ResponsesBody = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!("failed to decode response: {error}"))
        })?;

        body.into_text().ok_or_else(|| {
            GenerationError::InvalidResponse("response contained no output text".into())
        })
    }
}
