//! Core types for the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Returns the current Unix timestamp (seconds since UNIX_EPOCH).
///
/// Uses `instant::SystemTime` for cross-platform timing. If the system time
/// is before UNIX_EPOCH (extremely unlikely), returns 0 instead of panicking.
pub fn get_current_timestamp() -> u64 {
    instant::SystemTime::now()
        .duration_since(instant::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Unique chunk identifier.
///
/// The canonical form is `{document_id}_{counter}` where the counter is a
/// store-wide monotonically increasing sequence. Ids are assigned only by
/// [`DocumentStore::add_document`](crate::storage::DocumentStore::add_document)
/// and are unique for the lifetime of a store instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(String);

impl ChunkId {
    /// Builds the canonical id for a chunk of `document_id` assigned
    /// sequence number `seq`.
    pub fn new(document_id: &str, seq: u64) -> Self {
        Self(format!("{}_{}", document_id, seq))
    }

    /// Creates a ChunkId from its canonical string form.
    ///
    /// Useful for deserialization or testing. Be careful not to fabricate
    /// ids that collide with store-assigned ones.
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chunk as supplied by the ingestion feed, before the store assigns it
/// an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkInput {
    /// Raw passage text
    pub text: String,
    /// Page the passage came from, when the feed knows it
    pub page: Option<u32>,
}

impl ChunkInput {
    /// Convenience constructor for a pageless chunk.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page: None,
        }
    }

    /// Convenience constructor for a chunk with a page label.
    pub fn with_page(text: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            page: Some(page),
        }
    }
}

/// Stored chunk record. Immutable once stored; destroyed only by removing
/// its document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique chunk identifier
    pub id: ChunkId,
    /// Owning document (back-reference, non-owning)
    pub document_id: String,
    /// Store-wide assignment sequence number; strictly increasing across
    /// all chunks of a store instance
    pub seq: u64,
    /// Raw passage text
    pub text: String,
    /// Page the passage came from, when known
    pub page: Option<u32>,
    /// Position of this chunk within its document (0-indexed)
    pub position: usize,
    /// Whitespace-separated word count, computed at ingestion
    pub word_count: usize,
}

/// Per-document ledger entry: opaque metadata plus the ordered chunk ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Caller-supplied key/value metadata
    pub metadata: BTreeMap<String, String>,
    /// Chunk ids in ingestion order
    pub chunk_ids: Vec<ChunkId>,
}

/// Raw nearest-neighbor hit, not yet filtered or re-scored.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Chunk identifier
    pub chunk_id: ChunkId,
    /// Owning document
    pub document_id: String,
    /// Chunk text
    pub text: String,
    /// Raw similarity score (inner product of normalized vectors)
    pub score: f32,
    /// Page label, when known
    pub page: Option<u32>,
}

/// A candidate that survived filtering, carrying its quality and combined
/// scores. Output of the ranker, input to context assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// The underlying raw hit
    pub result: SearchResult,
    /// Heuristic quality score in `[0, 1]`
    pub quality_score: f32,
    /// Blend of raw similarity and quality, used for the final ordering
    pub combined_score: f32,
}

/// Industry domain selecting a specialized instruction preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndustryDomain {
    General,
    Medical,
    Finance,
    Retail,
    Education,
}

/// Query mode. Standard and Industry run the same pipeline with different
/// instruction preambles; Comparison is the multi-document flow of
/// [`compare_documents`](crate::retrieval::RetrievalEngine::compare_documents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Standard,
    Industry(IndustryDomain),
    Comparison,
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryMode::Standard => f.write_str("standard"),
            QueryMode::Industry(_) => f.write_str("industry"),
            QueryMode::Comparison => f.write_str("comparison"),
        }
    }
}

/// A retrieval-augmented query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The natural-language question
    pub text: String,
    /// Optional restriction to a set of document ids
    pub document_ids: Option<Vec<String>>,
    /// Query mode
    pub mode: QueryMode,
    /// Overrides the engine's default source budget when set
    pub max_sources: Option<usize>,
}

impl QueryRequest {
    /// A standard-mode query over the whole corpus.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            document_ids: None,
            mode: QueryMode::Standard,
            max_sources: None,
        }
    }

    /// Restricts the query to the given document ids.
    pub fn with_documents(mut self, document_ids: Vec<String>) -> Self {
        self.document_ids = Some(document_ids);
        self
    }

    /// Selects a query mode.
    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Overrides the source budget.
    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = Some(max_sources);
        self
    }
}

/// A source citation attached to a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAttribution {
    /// Owning document
    pub document_id: String,
    /// Leading excerpt of the chunk (at most 200 characters, with an
    /// ellipsis when trimmed)
    pub snippet: String,
    /// Page label, when known
    pub page: Option<u32>,
    /// Raw similarity score, rounded to 3 decimals
    pub relevance: f32,
}

/// The packaged outcome of a query or comparison.
///
/// Always structurally complete: expected-empty outcomes and generation
/// failures produce a response with zero confidence rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer, or a canned notice for empty/degraded outcomes
    pub answer: String,
    /// Citations for the context chunks the answer was grounded on
    pub sources: Vec<SourceAttribution>,
    /// Confidence estimate in `[0, 1]`; exactly 0 when no candidates
    /// survived filtering or the generation step failed
    pub confidence: f32,
    /// Mode the query ran in
    pub mode: QueryMode,
    /// Number of chunks that went into the context
    pub context_chunks: usize,
    /// Number of documents compared (comparison mode only)
    pub documents_compared: Option<usize>,
    /// Detail of the generation failure for degraded responses
    pub error: Option<String>,
}

/// Corpus statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Documents currently in the ledger
    pub total_documents: usize,
    /// Chunks currently in the ledger
    pub total_chunks: usize,
    /// Index entries ever added (tombstoned entries included)
    pub index_size: usize,
    /// Embedding dimension the index was built for
    pub dimension: usize,
}

/// Error types for retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Vector dimension mismatch (expected vs actual)
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension
        expected: usize,
        /// Actual embedding dimension received
        actual: usize,
    },
    /// `add` was called with differing vector and id counts
    #[error("Length mismatch: {vectors} vectors but {ids} chunk ids")]
    LengthMismatch {
        /// Number of vectors supplied
        vectors: usize,
        /// Number of chunk ids supplied
        ids: usize,
    },
    /// Embedding collaborator failure; fatal for the operation
    #[error("Embedding error: {0}")]
    Embedding(#[from] crate::error::EmbeddingError),
    /// Invalid query input
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Snapshot persistence failure
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] crate::storage::SnapshotError),
}

/// Validates that a vector has the expected dimension.
///
/// Returns `Ok(())` if dimensions match, or
/// `Err(RetrievalError::DimensionMismatch)` otherwise.
pub fn validate_dimension(expected: usize, actual: usize) -> Result<(), RetrievalError> {
    if actual == expected {
        Ok(())
    } else {
        Err(RetrievalError::DimensionMismatch { expected, actual })
    }
}
