//! Retrieval-augmented question answering: retrieve, format context, generate.

pub mod context;
mod service;
pub mod types;

pub use service::{RagService, RetrievedContext, generate_answer, retrieve_context};
pub use types::{ChatRequest, ChatResponse, DEFAULT_MODEL, RagError};
