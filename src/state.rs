//! Shared handler state, assembled once at startup.

use crate::{
    config::Config,
    generation::{GenerationClient, GenerationError, OpenAiResponsesClient},
    metrics::GatewayMetrics,
    rag::RagService,
    ragie::{DocumentClient, RagieError, RagieService, RetrievalClient},
};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while wiring the upstream clients.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Retrieval client could not be built.
    #[error("Failed to build retrieval client: {0}")]
    Retrieval(#[from] RagieError),
    /// Generation client could not be built.
    #[error("Failed to build generation client: {0}")]
    Generation(#[from] GenerationError),
}

/// Handles shared by every route. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub(crate) rag: Arc<RagService>,
    pub(crate) retrieval: Option<Arc<dyn RetrievalClient>>,
    pub(crate) documents: Option<Arc<dyn DocumentClient>>,
    pub(crate) generation_configured: bool,
    pub(crate) metrics: Arc<GatewayMetrics>,
}

impl AppState {
    /// Assemble state from upstream clients. `None` marks an unconfigured credential.
    pub fn new<C>(retrieval: Option<Arc<C>>, generation: Option<Arc<dyn GenerationClient>>) -> Self
    where
        C: RetrievalClient + DocumentClient + 'static,
    {
        let documents = retrieval
            .clone()
            .map(|client| client as Arc<dyn DocumentClient>);
        let retrieval = retrieval.map(|client| client as Arc<dyn RetrievalClient>);
        let generation_configured = generation.is_some();

        Self {
            rag: Arc::new(RagService::new(retrieval.clone(), generation)),
            retrieval,
            documents,
            generation_configured,
            metrics: Arc::new(GatewayMetrics::new()),
        }
    }

    /// Build the upstream clients described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let retrieval = RagieService::from_config(config)?.map(Arc::new);
        let generation = OpenAiResponsesClient::from_config(config)?
            .map(|client| Arc::new(client) as Arc<dyn GenerationClient>);

        tracing::info!(
            ragie_configured = retrieval.is_some(),
            openai_configured = generation.is_some(),
            "Upstream clients ready"
        );
        Ok(Self::new(retrieval, generation))
    }

    /// Whether retrieval and document routes can reach the retrieval service.
    pub fn ragie_configured(&self) -> bool {
        self.retrieval.is_some()
    }

    /// Whether the chat route can reach the generation service.
    pub fn openai_configured(&self) -> bool {
        self.generation_configured
    }
}
