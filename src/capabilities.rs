//! Capability descriptor resolved once at startup.
//!
//! Instead of probing for optional collaborators at call sites, the
//! application layer decides what is available when it wires the engine
//! together and passes the result in. Components consult the descriptor;
//! they never re-check availability themselves.

use serde::{Deserialize, Serialize};

/// Which optional collaborators the engine may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Whether the text-generation collaborator is wired up. With this
    /// disabled the orchestrator still retrieves and ranks, but answers
    /// with a sources-only notice instead of calling the generator.
    pub generation: bool,
}

impl Capabilities {
    /// All collaborators enabled.
    pub fn full() -> Self {
        Self { generation: true }
    }

    /// Retrieval and ranking only; the generator is never called.
    pub fn retrieval_only() -> Self {
        Self { generation: false }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::full()
    }
}
