//! Error types for the external collaborator seams.
//!
//! The retrieval pipeline itself reports failures through
//! [`RetrievalError`](crate::retrieval::RetrievalError); the types here cover
//! the two collaborators the engine delegates to: the embedding model and the
//! text generator. The orchestrator treats them very differently: embedding
//! failures are fatal and propagate, generation failures are caught and
//! converted into a degraded response.

use thiserror::Error;

/// Errors that can occur while producing embeddings.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// The model rejected the input or failed mid-inference
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    /// Model not available or initialization failed
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    /// The collaborator call exceeded its deadline
    #[error("Embedding timed out: {0}")]
    TimedOut(String),
}

/// Errors that can occur while generating an answer.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The generation call itself failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
    /// Model not available or initialization failed
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    /// The collaborator call exceeded its deadline
    #[error("Generation timed out: {0}")]
    TimedOut(String),
}
