//! HTTP surface for Ragbridge.
//!
//! Every route lives under `/api` and answers JSON. Failures use the envelope
//! `{ "error": string }` with the upstream status when one is available.
//!
//! - `GET /api/health` – Liveness plus which credentials are configured.
//! - `GET /api/documents` – List documents (`partition`, `limit`, `offset`).
//! - `POST /api/documents/upload` – Multipart upload forwarded to the retrieval service.
//! - `GET|DELETE /api/documents/:id` – Fetch or delete one document.
//! - `GET /api/documents/:id/chunks` – Chunks the retrieval service produced for a document.
//! - `POST /api/retrievals` – Raw ranked retrieval.
//! - `POST /api/chat` – Retrieval-augmented answer with the chunks it was built from.
//! - `GET /api/metrics` – Gateway counters.
//! - `GET /api/commands` – Machine-readable catalog of the routes above.

use crate::{
    metrics::MetricsSnapshot,
    rag::{ChatRequest, ChatResponse, RagError},
    ragie::{
        DEFAULT_DOCUMENT_LIMIT, DEFAULT_TOP_K, DocumentClient, DocumentListQuery, DocumentUpload,
        RagieError, RetrievalClient, RetrievalRequest, RetrievalResponse,
    },
    state::AppState,
};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::Instrument;
use uuid::Uuid;

/// Largest accepted upload body.
pub const UPLOAD_LIMIT_BYTES: usize = 100 * 1024 * 1024;

const RAGIE_NOT_CONFIGURED: &str = "Ragie API key not configured";
const QUERY_REQUIRED: &str = "Query is required";

/// Build the HTTP router. When `frontend_dir` is set, unmatched paths serve the browser UI.
pub fn create_router(state: AppState, frontend_dir: Option<&FsPath>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::OPTIONS,
            Method::PATCH,
            Method::DELETE,
            Method::POST,
            Method::PUT,
        ])
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/health", get(health))
        .route("/api/documents", get(list_documents))
        .route(
            "/api/documents/upload",
            post(upload_document).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route("/api/documents/:id", get(get_document).delete(delete_document))
        .route("/api/documents/:id/chunks", get(get_document_chunks))
        .route("/api/retrievals", post(retrieve))
        .route("/api/chat", post(chat))
        .route("/api/metrics", get(get_metrics))
        .route("/api/commands", get(get_commands))
        .with_state(state);

    let router = match frontend_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Serving frontend assets");
            let assets = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            router.fallback_service(assets)
        }
        None => router,
    };

    router.layer(cors).layer(TraceLayer::new_for_http())
}

/// Response body for `GET /api/health`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    ragie_configured: bool,
    openai_configured: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ragie_configured: state.ragie_configured(),
        openai_configured: state.openai_configured(),
    })
}

/// Query string of `GET /api/documents`.
#[derive(Deserialize)]
struct ListDocumentsParams {
    #[serde(default)]
    partition: Option<String>,
    #[serde(default)]
    limit: Option<u64>,
    #[serde(default)]
    offset: Option<u64>,
}

async fn list_documents(
    State(state): State<AppState>,
    params: Result<Query<ListDocumentsParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let documents = document_client(&state)?;
    let Query(params) = params?;
    let query = DocumentListQuery {
        partition: params.partition,
        limit: params.limit.unwrap_or(DEFAULT_DOCUMENT_LIMIT),
        offset: params.offset.unwrap_or(0),
    };
    let listing = documents
        .list_documents(&query)
        .await
        .map_err(|err| upstream_failure(&state, err))?;
    Ok(Json(listing))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let documents = document_client(&state)?;
    let document = documents
        .get_document(&id)
        .await
        .map_err(|err| upstream_failure(&state, err))?;
    Ok(Json(document))
}

async fn get_document_chunks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let documents = document_client(&state)?;
    let chunks = documents
        .get_document_chunks(&id)
        .await
        .map_err(|err| upstream_failure(&state, err))?;
    Ok(Json(chunks))
}

async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let documents = document_client(&state)?;
    documents
        .delete_document(&id)
        .await
        .map_err(|err| upstream_failure(&state, err))?;
    Ok(Json(json!({ "success": true })))
}

/// Forward a multipart upload.
///
/// Only `file` is required. `mode`, `name`, `partition`, and `external_id` are forwarded when
/// non-empty; `metadata` is forwarded only when it parses as JSON.
async fn upload_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, AppError> {
    let documents = document_client(&state)?;
    let mut multipart = multipart.map_err(|_| {
        AppError::bad_request("Content-Type must be multipart/form-data")
    })?;

    let mut upload = DocumentUpload::default();
    let mut has_file = false;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                upload.file_name = field.file_name().unwrap_or("upload").to_string();
                upload.content_type = field.content_type().map(str::to_string);
                upload.bytes = field.bytes().await?.to_vec();
                has_file = true;
            }
            "mode" => upload.mode = Some(field.text().await?),
            "name" => upload.name = Some(field.text().await?),
            "partition" => upload.partition = Some(field.text().await?),
            "external_id" => upload.external_id = Some(field.text().await?),
            "metadata" => upload.metadata = parse_metadata(&field.text().await?),
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    if !has_file {
        return Err(AppError::bad_request("No file uploaded"));
    }

    let created = documents
        .upload_document(upload)
        .await
        .map_err(|err| upstream_failure(&state, err))?;
    Ok(Json(created))
}

fn parse_metadata(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "Invalid metadata JSON; dropping it from the upload");
            None
        }
    }
}

/// Request body for `POST /api/retrievals`.
#[derive(Deserialize)]
struct RetrievalsBody {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    partition: Option<String>,
    #[serde(default = "default_top_k")]
    top_k: i64,
    #[serde(default)]
    filters: Option<Value>,
}

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

async fn retrieve(
    State(state): State<AppState>,
    payload: Result<Json<RetrievalsBody>, JsonRejection>,
) -> Result<Json<RetrievalResponse>, AppError> {
    let retrieval = retrieval_client(&state)?;
    let Json(body) = payload?;
    let query = body
        .query
        .filter(|query| !query.is_empty())
        .ok_or_else(|| AppError::bad_request(QUERY_REQUIRED))?;

    let request = RetrievalRequest::new(query, body.top_k)
        .with_partition(body.partition)
        .with_filters(body.filters);
    let response = retrieval
        .retrieve(&request)
        .await
        .map_err(|err| upstream_failure(&state, err))?;
    state
        .metrics
        .record_retrieval(response.scored_chunks.len() as u64);
    Ok(Json(response))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    state.rag.ensure_configured()?;
    let Json(request) = payload?;
    let span = tracing::info_span!("chat", request_id = %Uuid::new_v4());

    match state.rag.answer_question(request).instrument(span.clone()).await {
        Ok(response) => {
            state.metrics.record_chat(response.chunks.len() as u64);
            Ok(Json(response))
        }
        Err(err) => {
            if matches!(err, RagError::Retrieval(_) | RagError::Generation(_)) {
                state.metrics.record_upstream_failure();
            }
            span.in_scope(|| tracing::warn!(error = %err, "Chat request failed"));
            Err(err.into())
        }
    }
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<Value>,
}

/// Response body for `GET /api/commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by tools and the browser UI.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/api/health",
                description: "Report liveness and which upstream credentials are configured.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_documents",
                method: "GET",
                path: "/api/documents",
                description: "List documents in the store. Query parameters: partition, limit (default 100), offset (default 0).",
                request_example: None,
            },
            CommandDescriptor {
                name: "upload_document",
                method: "POST",
                path: "/api/documents/upload",
                description: "Upload a file as multipart/form-data with optional mode, name, partition, external_id, and JSON metadata.",
                request_example: None,
            },
            CommandDescriptor {
                name: "get_document",
                method: "GET",
                path: "/api/documents/:id",
                description: "Fetch one document by id.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_document",
                method: "DELETE",
                path: "/api/documents/:id",
                description: "Delete one document by id. Responds { \"success\": true }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "document_chunks",
                method: "GET",
                path: "/api/documents/:id/chunks",
                description: "List the chunks produced for a document.",
                request_example: None,
            },
            CommandDescriptor {
                name: "retrieve",
                method: "POST",
                path: "/api/retrievals",
                description: "Return the ranked chunks matching a query.",
                request_example: Some(json!({
                    "query": "What is the refund policy?",
                    "top_k": 5,
                    "partition": "optional-partition"
                })),
            },
            CommandDescriptor {
                name: "chat",
                method: "POST",
                path: "/api/chat",
                description: "Answer a question from retrieved chunks. Response returns { \"answer\", \"chunks\", \"model\", \"context_used\" }.",
                request_example: Some(json!({
                    "query": "What is the refund policy?",
                    "top_k": 5,
                    "model": "gpt-4.1-mini",
                    "system_prompt": "Answer in one sentence."
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/api/metrics",
                description: "Return gateway counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

fn retrieval_client(state: &AppState) -> Result<Arc<dyn RetrievalClient>, AppError> {
    state
        .retrieval
        .clone()
        .ok_or_else(|| AppError::internal(RAGIE_NOT_CONFIGURED))
}

fn document_client(state: &AppState) -> Result<Arc<dyn DocumentClient>, AppError> {
    state
        .documents
        .clone()
        .ok_or_else(|| AppError::internal(RAGIE_NOT_CONFIGURED))
}

fn upstream_failure(state: &AppState, err: RagieError) -> AppError {
    if !matches!(err, RagieError::InvalidDocumentId(_)) {
        state.metrics.record_upstream_failure();
    }
    err.into()
}

/// Error envelope returned by every route.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<RagieError> for AppError {
    fn from(err: RagieError) -> Self {
        if matches!(err, RagieError::InvalidDocumentId(_)) {
            return Self::bad_request(err.to_string());
        }
        Self {
            status: err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: err.upstream_message(),
        }
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let status = match &err {
            RagError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RagError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RagError::Retrieval(_) | RagError::Generation(_) => err
                .upstream_status()
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        };
        Self {
            status,
            message: err.client_message(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}
