//! EximDesk Store — SQLite-backed classification-code registry.
//!
//! Records are uniqued by `(hsn_code, heading_code)` and written with
//! idempotent batched upserts; embedding vectors are stored int8-quantized,
//! one per record, overwritten on re-ingestion.

pub mod embedding;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use embedding::QuantizedVec;
pub use sqlite::SqliteStore;
pub use types::{CodeEmbedding, CodeRecord, NewCodeRecord, RegistryStats, ScoredCode};

use eximdesk_core::Result;

/// The two write operations the import batcher is built against.
///
/// `SqliteStore` is the production implementation; tests substitute failing
/// or recording writers.
pub trait RegistryWriter: Send + Sync {
    /// Upsert a batch of records, updating existing rows in place.
    /// Returns the persisted rows, ids included.
    fn upsert_codes(&self, batch: &[NewCodeRecord]) -> Result<Vec<CodeRecord>>;

    /// Upsert embedding vectors keyed by record id, overwriting prior vectors.
    fn upsert_embeddings(&self, rows: &[CodeEmbedding]) -> Result<()>;
}
