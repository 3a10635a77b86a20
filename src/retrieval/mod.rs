//! Retrieval, ranking, and query orchestration.
//!
//! This module implements the pipeline that turns a raw nearest-neighbor
//! result set into a trustworthy, bounded context plus a confidence
//! estimate:
//!
//! - `types`: core types (ChunkId, records, SearchResult, QueryResponse,
//!   RetrievalError)
//! - `index`: flat inner-product similarity index with stable positions
//! - `ranker`: filter → quality score → blend → diversity pipeline
//! - `context`: bounded, labeled context assembly
//! - `prompt`: mode-specific prompt construction
//! - `engine`: the query orchestrator tying it all together
//!
//! # Usage
//!
//! ```ignore
//! use scriptorium::retrieval::{ChunkInput, QueryRequest, RetrievalEngine};
//!
//! let mut engine = RetrievalEngine::with_defaults(embedder, generator);
//! engine.add_document("manual", chunks, metadata).await?;
//!
//! let response = engine.query(&QueryRequest::new("how is it wired?")).await?;
//! println!("{} (confidence {})", response.answer, response.confidence);
//! ```
//!
//! # Algorithm Details
//!
//! **Similarity search**: exact inner product over L2-normalized vectors
//! (equal to cosine similarity), descending score with insertion-position
//! tie-breaks for reproducible results.
//!
//! **Ranking**: candidates below the relevance floor are dropped, the rest
//! get a heuristic quality score (keyword overlap, length band, sentence
//! completeness, lexical density, phrase and numeric bonuses) blended with
//! raw similarity at a similarity-dominant ratio.
//!
//! **Diversity**: greedy word-set Jaccard dedup keeps near-duplicate
//! passages out of the final context.

pub mod types;

pub mod context;
pub mod index;
pub mod prompt;
pub mod ranker;

mod engine;

pub use engine::RetrievalEngine;
pub use index::{IndexSnapshot, VectorIndex};
pub use types::{
    validate_dimension, ChunkId, ChunkInput, ChunkRecord, DocumentEntry, EngineStats,
    IndustryDomain, QueryMode, QueryRequest, QueryResponse, RetrievalError, ScoredCandidate,
    SearchResult, SourceAttribution,
};
