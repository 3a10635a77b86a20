//! Flat inner-product similarity index.
//!
//! Vectors are L2-normalized on insert and on query, so the inner product
//! of two stored/query vectors equals their cosine similarity. Search is an
//! exact linear scan: descending score, ties broken by ascending insertion
//! position, which makes results fully deterministic and reproducible.
//!
//! # Positional stability
//!
//! Positions are append-only and stable for the lifetime of an index
//! instance. A parallel `chunk_ids` table maps every position to the chunk
//! it represents and is never reordered; removing content marks a tombstone
//! that search skips, and an explicit [`rebuild`](VectorIndex::rebuild)
//! produces a compacted index. There is no in-place deletion.

use super::types::{validate_dimension, ChunkId, RetrievalError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::instrument;

/// Normalizes a vector to unit length in place and returns it boxed.
///
/// A zero vector stays zero; its inner product with anything is 0, which
/// ranks it below every real match.
fn l2_normalize(mut vector: Vec<f32>) -> Box<[f32]> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector.into_boxed_slice()
}

/// Serializable snapshot of an index. Paired with the ledger snapshot when
/// persisting; see [`crate::storage::snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Embedding dimension
    pub dimension: usize,
    /// Stored (already normalized) vectors in insertion order
    pub vectors: Vec<Vec<f32>>,
    /// Position-parallel chunk id table
    pub chunk_ids: Vec<ChunkId>,
    /// Tombstoned positions
    pub tombstones: Vec<usize>,
}

/// Append-only flat vector index over normalized embeddings.
pub struct VectorIndex {
    /// Fixed dimension for the lifetime of the instance
    dimension: usize,
    /// Stored vectors; `Box<[f32]>` keeps each embedding as a stable,
    /// exactly-sized heap allocation
    vectors: Vec<Box<[f32]>>,
    /// Append-only position -> chunk id table, parallel to `vectors`
    chunk_ids: Vec<ChunkId>,
    /// Positions excluded from search until the next rebuild
    tombstones: HashSet<usize>,
}

impl VectorIndex {
    /// Creates an empty index for vectors of `dimension` elements.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            chunk_ids: Vec::new(),
            tombstones: HashSet::new(),
        }
    }

    /// The dimension this index was created with.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Appends vectors at the next available positions.
    ///
    /// Vectors are normalized before storage. Returns the count added.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::LengthMismatch`] if `vectors` and
    /// `chunk_ids` differ in length, and
    /// [`RetrievalError::DimensionMismatch`] if any vector has the wrong
    /// dimension. Nothing is appended on error.
    #[instrument(skip_all, fields(count = vectors.len(), index_size = self.vectors.len()))]
    pub fn add(
        &mut self,
        vectors: Vec<Vec<f32>>,
        chunk_ids: Vec<ChunkId>,
    ) -> Result<usize, RetrievalError> {
        if vectors.len() != chunk_ids.len() {
            return Err(RetrievalError::LengthMismatch {
                vectors: vectors.len(),
                ids: chunk_ids.len(),
            });
        }
        for vector in &vectors {
            validate_dimension(self.dimension, vector.len())?;
        }

        let count = vectors.len();
        for (vector, chunk_id) in vectors.into_iter().zip(chunk_ids) {
            self.vectors.push(l2_normalize(vector));
            self.chunk_ids.push(chunk_id);
        }
        Ok(count)
    }

    /// Exact top-k search by inner product.
    ///
    /// Returns up to `k` `(position, score)` pairs sorted by descending
    /// score, ties broken by ascending insertion position. Tombstoned
    /// positions are skipped. `k == 0` or an empty index yields an empty
    /// result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::DimensionMismatch`] if the query vector
    /// has the wrong dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, RetrievalError> {
        validate_dimension(self.dimension, query.len())?;

        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let query = l2_normalize(query.to_vec());

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|(position, _)| !self.tombstones.contains(position))
            .map(|(position, vector)| {
                let score: f32 = vector.iter().zip(query.iter()).map(|(a, b)| a * b).sum();
                (position, score)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// The chunk id stored at `position`, or `None` past the end.
    ///
    /// The mapping is valid even for tombstoned positions; the table never
    /// shifts.
    pub fn chunk_id_at(&self, position: usize) -> Option<&ChunkId> {
        self.chunk_ids.get(position)
    }

    /// Finds the position of a chunk id.
    ///
    /// Linear scan; removal is infrequent enough that no reverse map is
    /// kept.
    pub fn find_position(&self, chunk_id: &ChunkId) -> Option<usize> {
        self.chunk_ids.iter().position(|id| id == chunk_id)
    }

    /// Number of entries ever added. Tombstoned entries are included; the
    /// index never implicitly shrinks.
    pub fn size(&self) -> usize {
        self.vectors.len()
    }

    /// Number of entries visible to search.
    pub fn live_len(&self) -> usize {
        self.vectors.len() - self.tombstones.len()
    }

    /// Whether no live entries remain.
    pub fn is_empty(&self) -> bool {
        self.live_len() == 0
    }

    /// Marks a position as removed. Search skips it from now on; the entry
    /// itself stays until [`rebuild`](Self::rebuild).
    pub fn mark_tombstone(&mut self, position: usize) {
        if position < self.vectors.len() {
            self.tombstones.insert(position);
        }
    }

    /// Number of tombstoned entries.
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Builds a compacted index containing only live entries, preserving
    /// their relative order. The original positions are not preserved;
    /// callers must treat the result as a fresh index.
    pub fn rebuild(&self) -> VectorIndex {
        let mut vectors = Vec::with_capacity(self.live_len());
        let mut chunk_ids = Vec::with_capacity(self.live_len());
        for (position, vector) in self.vectors.iter().enumerate() {
            if !self.tombstones.contains(&position) {
                vectors.push(vector.clone());
                chunk_ids.push(self.chunk_ids[position].clone());
            }
        }
        VectorIndex {
            dimension: self.dimension,
            vectors,
            chunk_ids,
            tombstones: HashSet::new(),
        }
    }

    /// Converts to a serializable snapshot.
    pub fn to_snapshot(&self) -> IndexSnapshot {
        let mut tombstones: Vec<usize> = self.tombstones.iter().copied().collect();
        tombstones.sort_unstable();
        IndexSnapshot {
            dimension: self.dimension,
            vectors: self.vectors.iter().map(|v| v.to_vec()).collect(),
            chunk_ids: self.chunk_ids.clone(),
            tombstones,
        }
    }

    /// Restores an index from a snapshot.
    ///
    /// Stored vectors were normalized before the snapshot was taken and are
    /// trusted as-is.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::LengthMismatch`] when the vector and id
    /// tables disagree, or [`RetrievalError::DimensionMismatch`] when any
    /// stored vector contradicts the snapshot's dimension.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self, RetrievalError> {
        if snapshot.vectors.len() != snapshot.chunk_ids.len() {
            return Err(RetrievalError::LengthMismatch {
                vectors: snapshot.vectors.len(),
                ids: snapshot.chunk_ids.len(),
            });
        }
        for vector in &snapshot.vectors {
            validate_dimension(snapshot.dimension, vector.len())?;
        }
        Ok(Self {
            dimension: snapshot.dimension,
            vectors: snapshot
                .vectors
                .into_iter()
                .map(|vector| vector.into_boxed_slice())
                .collect(),
            chunk_ids: snapshot.chunk_ids,
            tombstones: snapshot.tombstones.into_iter().collect(),
        })
    }
}
