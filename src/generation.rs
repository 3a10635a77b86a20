//! Text-generation collaborator seam.
//!
//! The orchestrator hands a fully assembled prompt to this trait and
//! packages whatever comes back. Generation failures are expected at this
//! boundary: the engine converts them into degraded responses instead of
//! propagating them (see
//! [`RetrievalEngine::query`](crate::retrieval::RetrievalEngine::query)).

use crate::error::GenerationError;
use async_trait::async_trait;

/// Trait for the generative language model collaborator.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a shared engine can serve
/// concurrent queries.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generates a completion for `prompt`.
    ///
    /// # Arguments
    ///
    /// * `prompt` - The assembled instruction-and-context prompt
    /// * `max_tokens` - Upper bound on generated tokens
    /// * `temperature` - Sampling temperature
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, GenerationError>;
}
