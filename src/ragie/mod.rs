//! Hosted retrieval service integration.
//!
//! The gateway never ranks or stores anything itself; it forwards queries and document
//! operations to the retrieval service and hands back what the service returns.

pub mod client;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

pub use client::RagieService;
pub use types::{
    DEFAULT_DOCUMENT_LIMIT, DEFAULT_TOP_K, DocumentListQuery, DocumentUpload,
    RagieError, RetrievalRequest, RetrievalResponse, ScoredChunk,
};

/// Ranked chunk retrieval.
#[async_trait]
pub trait RetrievalClient: Send + Sync {
    /// Return the chunks best matching `request`, best first.
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievalResponse, RagieError>;
}

/// Document management operations, forwarded one-to-one.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// List documents, optionally scoped to a partition.
    async fn list_documents(&self, query: &DocumentListQuery) -> Result<Value, RagieError>;

    /// Fetch one document by id.
    async fn get_document(&self, id: &str) -> Result<Value, RagieError>;

    /// Fetch the chunks the service produced for a document.
    async fn get_document_chunks(&self, id: &str) -> Result<Value, RagieError>;

    /// Delete a document.
    async fn delete_document(&self, id: &str) -> Result<(), RagieError>;

    /// Upload a new document.
    async fn upload_document(&self, upload: DocumentUpload) -> Result<Value, RagieError>;
}
