//! Request, response, and error types for question answering.

use crate::{
    generation::GenerationError,
    ragie::{DEFAULT_TOP_K, RagieError, ScoredChunk},
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Errors produced while answering a question.
#[derive(Debug, Error)]
pub enum RagError {
    /// A credential needed for the request is not configured.
    #[error("{0}")]
    Configuration(&'static str),
    /// The request itself is unusable.
    #[error("{0}")]
    InvalidInput(String),
    /// The retrieval call failed.
    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] RagieError),
    /// The generation call failed.
    #[error("Generation failed: {0}")]
    Generation(#[source] GenerationError),
}

impl RagError {
    /// Upstream status for upstream failures, `None` otherwise.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            Self::Retrieval(error) => error.status(),
            Self::Generation(error) => error.status(),
            Self::Configuration(_) | Self::InvalidInput(_) => None,
        }
    }

    /// Message shown to the caller. Upstream messages pass through unchanged.
    pub fn client_message(&self) -> String {
        match self {
            Self::Configuration(message) => (*message).to_string(),
            Self::InvalidInput(message) => message.clone(),
            Self::Retrieval(error) => error.upstream_message(),
            Self::Generation(error) => error.upstream_message(),
        }
    }
}

/// A question to answer from the document store.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The user's question. Required and non-empty.
    #[serde(default)]
    pub query: Option<String>,
    /// Partition restricting retrieval.
    #[serde(default)]
    pub partition: Option<String>,
    /// Number of chunks to retrieve.
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    /// Opaque metadata predicate forwarded to retrieval.
    #[serde(default)]
    pub filters: Option<Value>,
    /// Model used for generation.
    #[serde(default = "default_model")]
    pub model: String,
    /// Replacement for the default instructions.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    /// A request for `query` with every other field at its default.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            partition: None,
            top_k: DEFAULT_TOP_K,
            filters: None,
            model: default_model(),
            system_prompt: None,
        }
    }
}

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Generated answer together with the evidence it was produced from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    /// Generated text.
    pub answer: String,
    /// Chunks exactly as returned by retrieval.
    pub chunks: Vec<ScoredChunk>,
    /// Model that produced the answer.
    pub model: String,
    /// Context block injected into the prompt.
    pub context_used: String,
}
