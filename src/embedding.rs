//! Embedding collaborator seam.
//!
//! The engine never runs an embedding model itself; it calls through this
//! trait. Implementations may wrap a local model, a remote API, or a test
//! double: the engine only cares that every returned vector has the
//! advertised dimension.

use crate::error::EmbeddingError;
use async_trait::async_trait;

/// Trait for the embedding model collaborator.
///
/// # Contract
///
/// Every vector returned by [`embed`](Embedder::embed) and
/// [`embed_batch`](Embedder::embed_batch) must have exactly
/// [`dimension`](Embedder::dimension) elements; the engine treats any other
/// length as a fatal [`DimensionMismatch`](crate::retrieval::RetrievalError)
/// rather than silently padding or truncating. Failures propagate: there is
/// no fallback embedding.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a shared engine can serve
/// concurrent queries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the fixed dimension of vectors this model produces.
    fn dimension(&self) -> usize;

    /// Embeds a single text span.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds a batch of text spans, one vector per input, in order.
    ///
    /// More efficient than repeated [`embed`](Embedder::embed) calls when
    /// ingesting a document's chunks.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}
