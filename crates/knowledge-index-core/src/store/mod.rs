//! Storage abstraction for chunks and per-file index state.
//!
//! Two traits split the persisted state the way the pipeline uses it:
//!
//! | Trait | Keyed by | Holds |
//! |-------|----------|-------|
//! | [`ChunkStore`] | `(collection, source_file_id, chunk_index)` | text, vector, metadata |
//! | [`IndexStateStore`] | `(collection, source_file_id)` | status, chunk count, error |
//!
//! Implementations must be `Send + Sync` to work with async runtimes. A
//! single backend usually implements both (see [`memory::InMemoryStore`]).

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, IndexRecord, IndexUpdate};

/// Persistence for indexed chunks.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Delete every chunk of `(collection, source_file_id)` and insert `chunks`.
    ///
    /// Must be atomic: a reader sees either the old set or the new set,
    /// never a mix, and a failed call leaves the old set in place.
    async fn replace_chunks(
        &self,
        collection: &str,
        source_file_id: &str,
        chunks: &[Chunk],
    ) -> Result<()>;

    /// Delete every chunk of `(collection, source_file_id)`. Returns the number removed.
    async fn delete_chunks(&self, collection: &str, source_file_id: &str) -> Result<u64>;

    /// All chunks of a collection, ordered by file then chunk index.
    async fn list_chunks(&self, collection: &str) -> Result<Vec<Chunk>>;

    /// Number of chunks currently stored for one file.
    async fn count_chunks(&self, collection: &str, source_file_id: &str) -> Result<i64>;
}

/// Persistence for per-file index bookkeeping.
#[async_trait]
pub trait IndexStateStore: Send + Sync {
    /// Insert the record on first attempt, update it in place afterwards.
    ///
    /// `update.file_path == None` keeps the stored path.
    async fn upsert_record(&self, update: &IndexUpdate<'_>) -> Result<IndexRecord>;

    async fn get_record(
        &self,
        collection: &str,
        source_file_id: &str,
    ) -> Result<Option<IndexRecord>>;

    /// Records for one collection, or all collections when `None`.
    async fn list_records(&self, collection: Option<&str>) -> Result<Vec<IndexRecord>>;
}
