//! Question answering over retrieved document chunks.

use crate::{
    generation::{GenerationClient, GenerationRequest},
    rag::{
        context::{compose_prompt, format_context, resolve_system_prompt},
        types::{ChatRequest, ChatResponse, RagError},
    },
    ragie::{RetrievalClient, RetrievalRequest, ScoredChunk},
};
use std::sync::Arc;

const RETRIEVAL_NOT_CONFIGURED: &str = "Ragie API key not configured";
const GENERATION_NOT_CONFIGURED: &str = "OpenAI API key not configured";
const QUERY_REQUIRED: &str = "Query is required";

/// Composes one retrieval call and one generation call into an answer with citations.
///
/// Stateless between requests: the only shared data are the two upstream clients, which are
/// `None` when their credential is not configured.
pub struct RagService {
    retrieval: Option<Arc<dyn RetrievalClient>>,
    generation: Option<Arc<dyn GenerationClient>>,
}

/// Output of the retrieval stage, input of the generation stage.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Chunks as returned by retrieval.
    pub chunks: Vec<ScoredChunk>,
    /// Formatted context block.
    pub context: String,
}

impl RagService {
    /// Build the service around the configured upstream clients.
    pub fn new(
        retrieval: Option<Arc<dyn RetrievalClient>>,
        generation: Option<Arc<dyn GenerationClient>>,
    ) -> Self {
        Self {
            retrieval,
            generation,
        }
    }

    /// Fail with the first missing credential: retrieval, then generation.
    pub fn ensure_configured(&self) -> Result<(), RagError> {
        self.clients().map(|_| ())
    }

    fn clients(&self) -> Result<(&dyn RetrievalClient, &dyn GenerationClient), RagError> {
        let retrieval = self
            .retrieval
            .as_deref()
            .ok_or(RagError::Configuration(RETRIEVAL_NOT_CONFIGURED))?;
        let generation = self
            .generation
            .as_deref()
            .ok_or(RagError::Configuration(GENERATION_NOT_CONFIGURED))?;
        Ok((retrieval, generation))
    }

    /// Answer `request` from retrieved document content.
    ///
    /// Fails before any upstream call when a credential or the query is missing. A failed
    /// generation discards the retrieved chunks; there is no partial answer.
    pub async fn answer_question(&self, request: ChatRequest) -> Result<ChatResponse, RagError> {
        let (retrieval, generation) = self.clients()?;

        let ChatRequest {
            query,
            partition,
            top_k,
            filters,
            model,
            system_prompt,
        } = request;
        let query = query
            .filter(|query| !query.is_empty())
            .ok_or_else(|| RagError::InvalidInput(QUERY_REQUIRED.into()))?;

        let retrieval_request = RetrievalRequest::new(query.clone(), top_k)
            .with_partition(partition)
            .with_filters(filters);
        let retrieved = retrieve_context(retrieval, &retrieval_request).await?;

        let answer = generate_answer(
            generation,
            &retrieved,
            system_prompt.as_deref(),
            &query,
            &model,
        )
        .await?;

        tracing::info!(
            model = %model,
            chunks = retrieved.chunks.len(),
            answer_chars = answer.len(),
            "Chat answer assembled"
        );

        Ok(ChatResponse {
            answer,
            chunks: retrieved.chunks,
            model,
            context_used: retrieved.context,
        })
    }
}

/// First stage: fetch ranked chunks and format them as context.
pub async fn retrieve_context(
    retrieval: &dyn RetrievalClient,
    request: &RetrievalRequest,
) -> Result<RetrievedContext, RagError> {
    let response = retrieval
        .retrieve(request)
        .await
        .map_err(RagError::Retrieval)?;
    let chunks = response.scored_chunks;
    let context = format_context(&chunks);
    tracing::debug!(chunks = chunks.len(), context_chars = context.len(), "Context retrieved");
    Ok(RetrievedContext { chunks, context })
}

/// Second stage: compose the prompt around `retrieved` and generate the answer.
pub async fn generate_answer(
    generation: &dyn GenerationClient,
    retrieved: &RetrievedContext,
    system_prompt: Option<&str>,
    query: &str,
    model: &str,
) -> Result<String, RagError> {
    let input = compose_prompt(
        resolve_system_prompt(system_prompt),
        &retrieved.context,
        query,
    );
    generation
        .generate(&GenerationRequest {
            model: model.to_string(),
            input,
        })
        .await
        .map_err(RagError::Generation)
}
