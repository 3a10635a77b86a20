//! In-memory document/chunk ledger.
//!
//! Tracks per-document metadata and the ordered chunk ids belonging to each
//! document, and assigns globally unique chunk ids from a private monotonic
//! counter. The store knows nothing about embeddings; the caller embeds the
//! returned chunks and inserts them into the
//! [`VectorIndex`](crate::retrieval::VectorIndex) itself, so the ledger has
//! no dependency on the embedding collaborator.

use crate::retrieval::types::{ChunkId, ChunkInput, ChunkRecord, DocumentEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Serializable ledger state. Paired with the index snapshot when
/// persisting; see [`crate::storage::snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    /// Per-document entries keyed by caller-supplied id
    pub documents: BTreeMap<String, DocumentEntry>,
    /// Chunk records keyed by chunk id
    pub chunks: BTreeMap<ChunkId, ChunkRecord>,
    /// Next value of the chunk assignment counter
    pub chunk_counter: u64,
}

/// In-memory ledger of documents and chunks.
///
/// All state lives in private fields scoped to the instance; there are no
/// process-wide counters. `BTreeMap` keeps iteration and serialization
/// order deterministic.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: BTreeMap<String, DocumentEntry>,
    chunks: BTreeMap<ChunkId, ChunkRecord>,
    chunk_counter: u64,
}

impl DocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a document's chunks, assigning each a new globally unique id.
    ///
    /// Chunk ids take the form `{document_id}_{counter}` with a store-wide
    /// strictly increasing counter, so ids are unique for the lifetime of
    /// the store even across documents. Returns the assigned ids in chunk
    /// order; the caller uses them to key the embeddings it inserts into
    /// the index.
    ///
    /// Re-adding an existing document id replaces it: the previous entry
    /// and its chunk records are removed first (there is no update in
    /// place). Callers that maintain a vector index must tombstone the old
    /// chunks themselves: use
    /// [`remove_document`](Self::remove_document) before re-adding when the
    /// removed ids are needed.
    #[instrument(skip_all, fields(document_id, chunk_count = chunks.len()))]
    pub fn add_document(
        &mut self,
        document_id: &str,
        chunks: &[ChunkInput],
        metadata: BTreeMap<String, String>,
    ) -> Vec<ChunkId> {
        if self.documents.contains_key(document_id) {
            self.remove_document(document_id);
        }

        let mut chunk_ids = Vec::with_capacity(chunks.len());
        for (position, chunk) in chunks.iter().enumerate() {
            let seq = self.chunk_counter;
            self.chunk_counter += 1;

            let id = ChunkId::new(document_id, seq);
            let record = ChunkRecord {
                id: id.clone(),
                document_id: document_id.to_string(),
                seq,
                text: chunk.text.clone(),
                page: chunk.page,
                position,
                word_count: chunk.text.split_whitespace().count(),
            };
            self.chunks.insert(id.clone(), record);
            chunk_ids.push(id);
        }

        self.documents.insert(
            document_id.to_string(),
            DocumentEntry {
                metadata,
                chunk_ids: chunk_ids.clone(),
            },
        );

        debug!(
            document_id,
            chunks = chunk_ids.len(),
            "stored document chunks"
        );
        chunk_ids
    }

    /// Returns the ordered chunk records for a document.
    ///
    /// An unknown document id yields an empty vec, never an error.
    pub fn get_chunks(&self, document_id: &str) -> Vec<ChunkRecord> {
        let Some(entry) = self.documents.get(document_id) else {
            return Vec::new();
        };
        entry
            .chunk_ids
            .iter()
            .filter_map(|id| self.chunks.get(id).cloned())
            .collect()
    }

    /// Looks up a single chunk record.
    pub fn get_chunk(&self, chunk_id: &ChunkId) -> Option<&ChunkRecord> {
        self.chunks.get(chunk_id)
    }

    /// Returns a document's ledger entry.
    pub fn get_document(&self, document_id: &str) -> Option<&DocumentEntry> {
        self.documents.get(document_id)
    }

    /// Removes a document's metadata and chunk records.
    ///
    /// Returns the removed chunk ids so the caller can tombstone the
    /// corresponding index positions, or `None` if the document was
    /// unknown. Vectors already placed in the index are untouched; index
    /// accuracy after removal is the caller's concern.
    #[instrument(skip(self))]
    pub fn remove_document(&mut self, document_id: &str) -> Option<Vec<ChunkId>> {
        let entry = self.documents.remove(document_id)?;
        for chunk_id in &entry.chunk_ids {
            self.chunks.remove(chunk_id);
        }
        debug!(
            document_id,
            chunks = entry.chunk_ids.len(),
            "removed document"
        );
        Some(entry.chunk_ids)
    }

    /// Whether a document id is present.
    pub fn contains_document(&self, document_id: &str) -> bool {
        self.documents.contains_key(document_id)
    }

    /// All document ids, in sorted order.
    pub fn document_ids(&self) -> Vec<String> {
        self.documents.keys().cloned().collect()
    }

    /// Number of documents in the ledger.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of chunk records in the ledger.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Converts to a serializable ledger state.
    pub fn to_state(&self) -> LedgerState {
        LedgerState {
            documents: self.documents.clone(),
            chunks: self.chunks.clone(),
            chunk_counter: self.chunk_counter,
        }
    }

    /// Restores a store from a ledger state.
    pub fn from_state(state: LedgerState) -> Self {
        Self {
            documents: state.documents,
            chunks: state.chunks,
            chunk_counter: state.chunk_counter,
        }
    }
}
