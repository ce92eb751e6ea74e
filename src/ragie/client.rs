//! HTTP client wrapper for the hosted retrieval service.

use crate::config::{Config, normalize_base_url};
use crate::ragie::types::{
    DocumentListQuery, DocumentUpload, RagieError, RetrievalRequest, RetrievalResponse,
};
use crate::ragie::{DocumentClient, RetrievalClient};
use crate::upstream::{build_http_client, format_endpoint, read_failure};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, IntoUrl, Method, Url};
use serde_json::Value;

const USER_AGENT: &str = "ragbridge/0.2";
const ERROR_POINTER: &str = "/detail";

/// Lightweight HTTP client for retrieval service operations.
pub struct RagieService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
}

impl RagieService {
    /// Construct a client for `base_url` authenticated with `api_key`.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, RagieError> {
        let client = build_http_client(USER_AGENT, timeout_secs)?;
        let base_url = normalize_base_url(base_url).map_err(RagieError::InvalidUrl)?;
        tracing::debug!(url = %base_url, timeout_secs = ?timeout_secs, "Initialized retrieval HTTP client");

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Build a client from configuration, or `None` when no credential is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, RagieError> {
        config
            .ragie_api_key
            .as_deref()
            .map(|key| Self::new(&config.ragie_api_base, key, config.upstream_timeout_secs))
            .transpose()
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.authorized(method, format_endpoint(&self.base_url, path))
    }

    fn authorized(&self, method: Method, url: impl IntoUrl) -> reqwest::RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.api_key)
    }

    /// `documents/{id}[/{suffix}]` with `id` encoded as exactly one path segment.
    fn document_url(&self, id: &str, suffix: Option<&str>) -> Result<Url, RagieError> {
        if matches!(id, "" | "." | "..") {
            return Err(RagieError::InvalidDocumentId(id.to_string()));
        }
        let mut url =
            Url::parse(&self.base_url).map_err(|err| RagieError::InvalidUrl(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| RagieError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("documents")
            .push(id)
            .extend(suffix);
        Ok(url)
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<Value, RagieError> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response.json().await?);
        }

        let (status, message) = read_failure(response, ERROR_POINTER).await;
        let error = RagieError::UnexpectedStatus { status, message };
        tracing::error!(operation, error = %error, "Retrieval service request failed");
        Err(error)
    }
}

#[async_trait]
impl RetrievalClient for RagieService {
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievalResponse, RagieError> {
        tracing::debug!(
            top_k = request.top_k,
            partition = ?request.partition,
            has_filters = request.filters.is_some(),
            "Requesting retrieval"
        );
        let body = self
            .send_json(
                self.request(Method::POST, "retrievals").json(request),
                "retrieve",
            )
            .await?;
        serde_json::from_value(body).map_err(|err| RagieError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl DocumentClient for RagieService {
    async fn list_documents(&self, query: &DocumentListQuery) -> Result<Value, RagieError> {
        self.send_json(
            self.request(Method::GET, "documents")
                .query(&query.to_query_pairs()),
            "list_documents",
        )
        .await
    }

    async fn get_document(&self, id: &str) -> Result<Value, RagieError> {
        let url = self.document_url(id, None)?;
        self.send_json(self.authorized(Method::GET, url), "get_document")
            .await
    }

    async fn get_document_chunks(&self, id: &str) -> Result<Value, RagieError> {
        let url = self.document_url(id, Some("chunks"))?;
        self.send_json(self.authorized(Method::GET, url), "get_document_chunks")
            .await
    }

    async fn delete_document(&self, id: &str) -> Result<(), RagieError> {
        let url = self.document_url(id, None)?;
        let response = self.authorized(Method::DELETE, url).send().await?;
        if response.status().is_success() {
            tracing::info!(document_id = id, "Document deleted");
            return Ok(());
        }

        let (status, message) = read_failure(response, ERROR_POINTER).await;
        let error = RagieError::UnexpectedStatus { status, message };
        tracing::error!(document_id = id, error = %error, "Failed to delete document");
        Err(error)
    }

    async fn upload_document(&self, upload: DocumentUpload) -> Result<Value, RagieError> {
        let file_name = upload.file_name.clone();
        let size = upload.bytes.len();
        let text_fields = upload.text_fields();
        let metadata = upload.metadata.as_ref().map(Value::to_string);

        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let mut form = Form::new().part("file", part);
        for (key, value) in text_fields {
            form = form.text(key, value);
        }
        if let Some(metadata) = metadata {
            form = form.text("metadata", metadata);
        }

        tracing::info!(file_name = %file_name, bytes = size, "Uploading document");
        self.send_json(
            self.request(Method::POST, "documents").multipart(form),
            "upload_document",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{DELETE, GET, POST},
        MockServer,
    };
    use reqwest::StatusCode;
    use serde_json::json;

    fn service(server: &MockServer) -> RagieService {
        RagieService::new(&server.base_url(), "test-key", None).expect("client")
    }

    #[tokio::test]
    async fn retrieve_emits_expected_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/retrievals")
                    .header("authorization", "Bearer test-key")
                    .json_body(json!({
                        "query": "What is the refund policy?",
                        "top_k": 3,
                        "partition": "support"
                    }));
                then.status(200).json_body(json!({
                    "scored_chunks": [
                        {
                            "text": "Refunds are issued within 30 days.",
                            "score": 0.87,
                            "document_metadata": { "document_name": "policy.pdf" }
                        }
                    ]
                }));
            })
            .await;

        let request = RetrievalRequest::new("What is the refund policy?", 3)
            .with_partition(Some("support".into()));
        let response = service(&server)
            .retrieve(&request)
            .await
            .expect("retrieval");

        mock.assert_async().await;
        assert_eq!(response.scored_chunks.len(), 1);
        assert_eq!(response.scored_chunks[0].document_name(), Some("policy.pdf"));
    }

    #[tokio::test]
    async fn retrieve_surfaces_status_and_detail() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/retrievals");
                then.status(429)
                    .json_body(json!({ "detail": "Rate limit exceeded" }));
            })
            .await;

        let error = service(&server)
            .retrieve(&RetrievalRequest::new("q", 5))
            .await
            .expect_err("rate limited");

        assert_eq!(error.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(error.upstream_message(), "Rate limit exceeded");
    }

    #[tokio::test]
    async fn list_documents_forwards_pagination() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/documents")
                    .query_param("limit", "20")
                    .query_param("offset", "40")
                    .query_param("partition", "support");
                then.status(200)
                    .json_body(json!({ "documents": [{ "id": "doc-1" }], "pagination": {} }));
            })
            .await;

        let documents = service(&server)
            .list_documents(&DocumentListQuery {
                partition: Some("support".into()),
                limit: 20,
                offset: 40,
            })
            .await
            .expect("documents");

        mock.assert_async().await;
        assert_eq!(documents["documents"][0]["id"], "doc-1");
    }

    #[tokio::test]
    async fn delete_document_reports_missing_document() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/documents/doc-404");
                then.status(404)
                    .json_body(json!({ "detail": "Document not found" }));
            })
            .await;

        let error = service(&server)
            .delete_document("doc-404")
            .await
            .expect_err("missing");

        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(error.upstream_message(), "Document not found");
    }

    #[tokio::test]
    async fn document_id_stays_a_single_path_segment() {
        let server = MockServer::start_async().await;
        let escaped = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/retrievals");
                then.status(200).json_body(json!({}));
            })
            .await;
        let scoped = server
            .mock_async(|when, then| {
                when.method(DELETE).path_contains("/documents/");
                then.status(404)
                    .json_body(json!({ "detail": "Document not found" }));
            })
            .await;

        let error = service(&server)
            .delete_document("../retrievals")
            .await
            .expect_err("no such document");

        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
        escaped.assert_hits_async(0).await;
        scoped.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn dot_segment_document_ids_are_rejected_locally() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.path_contains("/");
                then.status(200).json_body(json!({}));
            })
            .await;

        let ragie = service(&server);
        for id in ["", ".", ".."] {
            let error = ragie.get_document(id).await.expect_err("rejected");
            assert!(matches!(error, RagieError::InvalidDocumentId(_)));
        }
        let error = ragie
            .get_document_chunks("..")
            .await
            .expect_err("rejected");
        assert!(matches!(error, RagieError::InvalidDocumentId(_)));
        any.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn document_chunks_use_encoded_id() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/documents/doc-1/chunks");
                then.status(200).json_body(json!({ "chunks": [] }));
            })
            .await;

        let chunks = service(&server)
            .get_document_chunks("doc-1")
            .await
            .expect("chunks");

        mock.assert_async().await;
        assert_eq!(chunks["chunks"], json!([]));
    }

    #[tokio::test]
    async fn upload_document_sends_multipart_form() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/documents")
                    .header_exists("content-type")
                    .body_contains("name=\"file\"; filename=\"notes.txt\"")
                    .body_contains("name=\"partition\"")
                    .body_contains("{\"team\":\"billing\"}");
                then.status(200)
                    .json_body(json!({ "id": "doc-9", "status": "pending" }));
            })
            .await;

        let created = service(&server)
            .upload_document(DocumentUpload {
                file_name: "notes.txt".into(),
                content_type: Some("text/plain".into()),
                bytes: b"hello".to_vec(),
                partition: Some("support".into()),
                metadata: Some(json!({ "team": "billing" })),
                ..Default::default()
            })
            .await
            .expect("upload");

        mock.assert_async().await;
        assert_eq!(created["id"], "doc-9");
    }

    #[test]
    fn from_config_requires_credential() {
        let config = Config::unconfigured();
        assert!(RagieService::from_config(&config).expect("config").is_none());
    }
}
