//! Document ledger and snapshot persistence.
//!
//! - [`DocumentStore`]: in-memory ledger of documents and chunks with a
//!   private monotonic id counter
//! - [`snapshot`]: paired index + ledger artifacts with a versioned
//!   manifest; both must be saved and restored together

mod document_store;
pub mod snapshot;

pub use document_store::{DocumentStore, LedgerState};
pub use snapshot::{LedgerSnapshot, SnapshotError, SnapshotManifest, CURRENT_SCHEMA_VERSION};
