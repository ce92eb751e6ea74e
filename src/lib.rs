#![deny(missing_docs)]

//! Core library for the Ragbridge gateway.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Language-model client abstraction and adapters.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Gateway activity counters.
pub mod metrics;
/// Retrieval-augmented question answering.
pub mod rag;
/// Hosted retrieval service integration.
pub mod ragie;
/// Shared handler state.
pub mod state;
mod upstream;
