//! # Scriptorium
//!
//! Retrieval-and-ranking engine for document question answering.
//!
//! Scriptorium stores embedded document chunks, answers nearest-neighbor
//! queries over them, ranks and deduplicates the candidates, and assembles
//! a bounded context plus a confidence estimate for a text-generation
//! collaborator. Document conversion, the embedding model, and the
//! generative model are external: they sit behind narrow traits and are
//! wired in at startup.
//!
//! ## Modules
//!
//! - [`retrieval`] - Similarity index, ranking pipeline, context assembly,
//!   and the query orchestrator
//! - [`storage`] - Document/chunk ledger and paired snapshot persistence
//! - [`embedding`] - Embedding collaborator trait
//! - [`generation`] - Text-generation collaborator trait
//! - [`config`] - Tunable weights and thresholds with documented defaults
//! - [`capabilities`] - Startup capability descriptor
//! - [`error`] - Collaborator error types

pub mod capabilities;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod retrieval;
pub mod storage;
