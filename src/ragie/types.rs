//! Shared types used by the retrieval service client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Default number of chunks requested when the caller does not choose.
pub const DEFAULT_TOP_K: i64 = 5;
/// Default page size for document listings.
pub const DEFAULT_DOCUMENT_LIMIT: u64 = 100;

/// Errors returned while interacting with the retrieval service.
#[derive(Debug, Error)]
pub enum RagieError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid retrieval service URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The retrieval service responded with a non-success status.
    #[error("Unexpected retrieval service response ({status}): {message}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Message extracted from the response body.
        message: String,
    },
    /// A document id that cannot be addressed as a single path segment.
    #[error("Invalid document id: {0:?}")]
    InvalidDocumentId(String),
    /// The service answered successfully but the body did not have the expected shape.
    #[error("Malformed retrieval service response: {0}")]
    InvalidResponse(String),
}

impl RagieError {
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

/// Body of a `POST /retrievals` call.
///
/// Optional scoping fields are skipped entirely when absent so the service applies its own
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalRequest {
    /// Natural-language query.
    pub query: String,
    /// Number of chunks to return, passed through as received.
    pub top_k: i64,
    /// Partition restricting the search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    /// Opaque metadata predicate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,
}

impl RetrievalRequest {
    /// Build a request with no scoping.
    pub fn new(query: impl Into<String>, top_k: i64) -> Self {
        Self {
            query: query.into(),
            top_k,
            partition: None,
            filters: None,
        }
    }

    /// Scope to a partition. Blank partitions are dropped.
    pub fn with_partition(mut self, partition: Option<String>) -> Self {
        self.partition = partition.filter(|value| !value.trim().is_empty());
        self
    }

    /// Attach a filter predicate. `null` is treated as absent.
    pub fn with_filters(mut self, filters: Option<Value>) -> Self {
        self.filters = filters.filter(|value| !value.is_null());
        self
    }
}

/// Response of `POST /retrievals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResponse {
    /// Ranked chunks, best first.
    #[serde(default)]
    pub scored_chunks: Vec<ScoredChunk>,
    /// Any other top-level fields the service sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A chunk of document text returned as evidence for a query.
///
/// Held exactly as the service sent it so it can be handed back unchanged. Only `text`,
/// `score`, and `document_metadata.document_name` are ever read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoredChunk(Map<String, Value>);

impl ScoredChunk {
    /// Chunk text; empty when the service sent none.
    pub fn text(&self) -> &str {
        self.0.get("text").and_then(Value::as_str).unwrap_or_default()
    }

    /// Relevance score; `0.0` when missing or not a number.
    pub fn score(&self) -> f64 {
        self.0.get("score").and_then(Value::as_f64).unwrap_or_default()
    }

    /// Name of the source document, if the service reported a non-empty one.
    pub fn document_name(&self) -> Option<&str> {
        self.0
            .get("document_metadata")
            .and_then(|metadata| metadata.get("document_name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// Pagination and scoping for `GET /documents`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentListQuery {
    /// Partition to list; blank means all.
    pub partition: Option<String>,
    /// Page size.
    pub limit: u64,
    /// Page offset.
    pub offset: u64,
}

impl Default for DocumentListQuery {
    fn default() -> Self {
        Self {
            partition: None,
            limit: DEFAULT_DOCUMENT_LIMIT,
            offset: 0,
        }
    }
}

impl DocumentListQuery {
    pub(crate) fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        if let Some(partition) = self
            .partition
            .as_deref()
            .filter(|value| !value.trim().is_empty())
        {
            pairs.push(("partition", partition.to_string()));
        }
        pairs
    }
}

/// A file plus the optional fields forwarded on upload.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpload {
    /// Client-side file name.
    pub file_name: String,
    /// MIME type reported by the browser.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
    /// Processing mode (e.g. `fast`, `hi_res`).
    pub mode: Option<String>,
    /// Display name override.
    pub name: Option<String>,
    /// Target partition.
    pub partition: Option<String>,
    /// Caller-side identifier.
    pub external_id: Option<String>,
    /// Custom metadata object.
    pub metadata: Option<Value>,
}

impl DocumentUpload {
    /// Text fields to forward, skipping blank ones.
    pub(crate) fn text_fields(&self) -> Vec<(&'static str, String)> {
        [
            ("mode", &self.mode),
            ("name", &self.name),
            ("partition", &self.partition),
            ("external_id", &self.external_id),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|text| !text.is_empty())
                .map(|text| (key, text.to_string()))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn retrieval_request_omits_absent_scope() {
        let request = RetrievalRequest::new("refunds", DEFAULT_TOP_K)
            .with_partition(Some("   ".into()))
            .with_filters(Some(Value::Null));
        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(body, json!({ "query": "refunds", "top_k": 5 }));
    }

    #[test]
    fn retrieval_request_keeps_zero_top_k_and_scope() {
        let request = RetrievalRequest::new("refunds", 0)
            .with_partition(Some("support".into()))
            .with_filters(Some(json!({ "department": { "$eq": "billing" } })));
        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            body,
            json!({
                "query": "refunds",
                "top_k": 0,
                "partition": "support",
                "filters": { "department": { "$eq": "billing" } }
            })
        );
    }

    #[test]
    fn scored_chunk_preserves_unknown_fields() {
        let raw = json!({
            "text": "Refunds within 30 days.",
            "score": 0.91,
            "id": "c-1",
            "index": 4,
            "document_id": "doc-1",
            "document_metadata": {
                "document_name": "policy.pdf",
                "document_type": "pdf",
                "team": "billing"
            },
            "links": { "self": { "href": "https://example.org" } }
        });
        let chunk: ScoredChunk = serde_json::from_value(raw.clone()).expect("chunk");
        assert_eq!(chunk.document_name(), Some("policy.pdf"));
        assert_eq!(serde_json::to_value(&chunk).expect("serialize"), raw);
    }

    #[test]
    fn scored_chunk_keeps_nulls_and_integer_scores() {
        let raw = json!({
            "chunk_id": null,
            "document_metadata": { "document_name": null, "document_type": null },
            "score": 1,
            "text": "a"
        });
        let chunk: ScoredChunk = serde_json::from_value(raw.clone()).expect("chunk");
        assert_eq!(chunk.score(), 1.0);
        assert_eq!(chunk.document_name(), None);
        assert_eq!(serde_json::to_string(&chunk).expect("serialize"), raw.to_string());
    }

    #[test]
    fn scored_chunk_accepts_any_metadata_value_types() {
        let raw = json!({
            "text": "Refunds within 30 days.",
            "score": 0.5,
            "document_metadata": {
                "document_id": 42,
                "partition": ["a", "b"],
                "document_type": { "kind": "pdf" },
                "document_name": "policy.pdf"
            }
        });
        let chunk: ScoredChunk = serde_json::from_value(raw.clone()).expect("chunk");
        assert_eq!(chunk.text(), "Refunds within 30 days.");
        assert_eq!(chunk.document_name(), Some("policy.pdf"));
        assert_eq!(serde_json::to_value(&chunk).expect("serialize"), raw);
    }

    #[test]
    fn non_string_document_name_counts_as_missing() {
        let chunk: ScoredChunk = serde_json::from_value(json!({
            "text": "x",
            "score": "high",
            "document_metadata": { "document_name": 7 }
        }))
        .expect("chunk");
        assert_eq!(chunk.document_name(), None);
        assert_eq!(chunk.score(), 0.0);
    }

    #[test]
    fn empty_document_name_counts_as_missing() {
        let chunk: ScoredChunk = serde_json::from_value(json!({
            "text": "x",
            "score": 0.5,
            "document_metadata": { "document_name": "" }
        }))
        .expect("chunk");
        assert_eq!(chunk.document_name(), None);
    }

    #[test]
    fn missing_scored_chunks_is_empty() {
        let response: RetrievalResponse = serde_json::from_value(json!({})).expect("response");
        assert!(response.scored_chunks.is_empty());
    }

    #[test]
    fn list_query_skips_blank_partition() {
        let query = DocumentListQuery {
            partition: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            query.to_query_pairs(),
            vec![("limit", "100".to_string()), ("offset", "0".to_string())]
        );
    }

    #[test]
    fn upload_text_fields_skip_blank_values() {
        let upload = DocumentUpload {
            mode: Some("hi_res".into()),
            name: Some(String::new()),
            partition: Some("support".into()),
            ..Default::default()
        };
        assert_eq!(
            upload.text_fields(),
            vec![
                ("mode", "hi_res".to_string()),
                ("partition", "support".to_string())
            ]
        );
    }
}
