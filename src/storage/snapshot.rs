//! Paired snapshot persistence.
//!
//! A snapshot consists of two artifacts written side by side: the vector
//! index contents (`{prefix}.index.json`) and the metadata ledger
//! (`{prefix}.ledger.json`, which also carries a versioned manifest). They
//! are only meaningful together: loading verifies the pairing and fails
//! fatally on a missing artifact, an unsupported schema version, or a
//! dimension disagreement between the two files.

use super::document_store::LedgerState;
use crate::retrieval::index::IndexSnapshot;
use crate::retrieval::types::get_current_timestamp;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Current schema version for the snapshot format.
///
/// Increment on breaking changes to either artifact.
/// - v1: initial format (index.json + ledger.json with manifest)
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Errors that can occur during snapshot persistence.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// One of the paired artifacts is missing
    #[error("Missing snapshot artifact: {0}")]
    MissingArtifact(String),
    /// Snapshot was written by an incompatible schema version
    #[error("Incompatible snapshot schema: found v{found}, supported v{supported}")]
    IncompatibleSchema {
        /// Version found in the manifest
        found: u32,
        /// Highest version this build can read
        supported: u32,
    },
    /// Index and ledger artifacts disagree on the embedding dimension
    #[error("Snapshot pairing mismatch: index dimension {index_dimension}, ledger dimension {ledger_dimension}")]
    PairingMismatch {
        /// Dimension recorded in the index artifact
        index_dimension: usize,
        /// Dimension recorded in the ledger manifest
        ledger_dimension: usize,
    },
}

impl From<std::io::Error> for SnapshotError {
    fn from(e: std::io::Error) -> Self {
        SnapshotError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Serialization(e.to_string())
    }
}

/// Manifest stored inside the ledger artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    /// Schema version this snapshot was written with
    pub schema_version: u32,
    /// Minimum schema version required to read it
    pub min_compatible_version: u32,
    /// Unix timestamp when the snapshot was written
    pub created_at: u64,
    /// Embedding dimension of the paired index
    pub dimension: usize,
    /// Documents in the ledger at save time
    pub document_count: usize,
    /// Chunks in the ledger at save time
    pub chunk_count: usize,
}

impl SnapshotManifest {
    /// Builds a manifest for a snapshot being written now.
    pub fn new(dimension: usize, document_count: usize, chunk_count: usize) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            min_compatible_version: 1,
            created_at: get_current_timestamp(),
            dimension,
            document_count,
            chunk_count,
        }
    }

    /// Whether this build can read the snapshot.
    pub fn is_compatible(&self) -> bool {
        CURRENT_SCHEMA_VERSION >= self.min_compatible_version
            && self.schema_version <= CURRENT_SCHEMA_VERSION
    }
}

/// The ledger artifact: manifest plus store state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Versioned manifest
    pub manifest: SnapshotManifest,
    /// Document store contents
    pub ledger: LedgerState,
}

fn index_path(prefix: &Path) -> PathBuf {
    PathBuf::from(format!("{}.index.json", prefix.display()))
}

fn ledger_path(prefix: &Path) -> PathBuf {
    PathBuf::from(format!("{}.ledger.json", prefix.display()))
}

/// Writes both snapshot artifacts.
pub fn save(
    prefix: &Path,
    index: &IndexSnapshot,
    ledger: &LedgerSnapshot,
) -> Result<(), SnapshotError> {
    std::fs::write(index_path(prefix), serde_json::to_vec(index)?)?;
    std::fs::write(ledger_path(prefix), serde_json::to_vec(ledger)?)?;
    info!(
        prefix = %prefix.display(),
        documents = ledger.manifest.document_count,
        chunks = ledger.manifest.chunk_count,
        "saved snapshot"
    );
    Ok(())
}

/// Reads and validates both snapshot artifacts.
///
/// # Errors
///
/// - [`SnapshotError::MissingArtifact`] when either file is absent
/// - [`SnapshotError::IncompatibleSchema`] for unreadable versions
/// - [`SnapshotError::PairingMismatch`] when the two artifacts disagree on
///   the embedding dimension
pub fn load(prefix: &Path) -> Result<(IndexSnapshot, LedgerSnapshot), SnapshotError> {
    let index_file = index_path(prefix);
    let ledger_file = ledger_path(prefix);

    for path in [&index_file, &ledger_file] {
        if !path.exists() {
            return Err(SnapshotError::MissingArtifact(path.display().to_string()));
        }
    }

    let index: IndexSnapshot = serde_json::from_slice(&std::fs::read(&index_file)?)?;
    let ledger: LedgerSnapshot = serde_json::from_slice(&std::fs::read(&ledger_file)?)?;

    if !ledger.manifest.is_compatible() {
        return Err(SnapshotError::IncompatibleSchema {
            found: ledger.manifest.schema_version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }
    if index.dimension != ledger.manifest.dimension {
        return Err(SnapshotError::PairingMismatch {
            index_dimension: index.dimension,
            ledger_dimension: ledger.manifest.dimension,
        });
    }

    info!(
        prefix = %prefix.display(),
        documents = ledger.manifest.document_count,
        chunks = ledger.manifest.chunk_count,
        "loaded snapshot"
    );
    Ok((index, ledger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::types::ChunkId;

    fn sample_index(dimension: usize) -> IndexSnapshot {
        IndexSnapshot {
            dimension,
            vectors: vec![vec![1.0; dimension]],
            chunk_ids: vec![ChunkId::new("doc", 0)],
            tombstones: Vec::new(),
        }
    }

    fn sample_ledger(dimension: usize) -> LedgerSnapshot {
        LedgerSnapshot {
            manifest: SnapshotManifest::new(dimension, 1, 1),
            ledger: LedgerState {
                documents: Default::default(),
                chunks: Default::default(),
                chunk_counter: 1,
            },
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("corpus");

        save(&prefix, &sample_index(4), &sample_ledger(4)).unwrap();
        let (index, ledger) = load(&prefix).unwrap();

        assert_eq!(index.dimension, 4);
        assert_eq!(index.vectors.len(), 1);
        assert_eq!(ledger.manifest.chunk_count, 1);
    }

    #[test]
    fn missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("corpus");

        // Only the index artifact exists.
        std::fs::write(
            index_path(&prefix),
            serde_json::to_vec(&sample_index(4)).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            load(&prefix),
            Err(SnapshotError::MissingArtifact(_))
        ));
    }

    #[test]
    fn mismatched_pairing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("corpus");

        save(&prefix, &sample_index(4), &sample_ledger(8)).unwrap();
        assert!(matches!(
            load(&prefix),
            Err(SnapshotError::PairingMismatch {
                index_dimension: 4,
                ledger_dimension: 8
            })
        ));
    }

    #[test]
    fn future_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("corpus");

        let mut ledger = sample_ledger(4);
        ledger.manifest.schema_version = CURRENT_SCHEMA_VERSION + 1;
        ledger.manifest.min_compatible_version = CURRENT_SCHEMA_VERSION + 1;
        save(&prefix, &sample_index(4), &ledger).unwrap();

        assert!(matches!(
            load(&prefix),
            Err(SnapshotError::IncompatibleSchema { .. })
        ));
    }
}
