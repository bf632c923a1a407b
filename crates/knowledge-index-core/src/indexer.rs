//! Per-file indexing: fetch → chunk → embed → replace chunks → record state.
//!
//! [`FileIndexer::index_file`] is the unit of idempotent work. Calling it
//! again for a file that was indexed or failed before performs a full
//! re-index, never a diff.
//!
//! # Failure policy
//!
//! | Failure | Stored chunks | Record |
//! |---------|---------------|--------|
//! | fetch error | kept (last good index stays queryable) | `failed` |
//! | empty text | deleted | `failed`, `"file is empty"` |
//! | embedding error | kept | `failed` |
//! | chunk write error | kept (replacement is transactional) | `failed` |
//! | record write error | n/a | fatal, returned as `Err` |
//!
//! A failed record always carries `chunk_count = 0` and a non-empty error.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::chunk::Chunker;
use crate::embedding::EmbeddingBatcher;
use crate::error::{IndexError, Result};
use crate::models::{Chunk, ChunkMetadata, FileIndexResult, IndexStatus, IndexUpdate};
use crate::source::ContentSource;
use crate::store::{ChunkStore, IndexStateStore};

type FileKey = (String, String);

/// Indexes single files into a chunk store and records their state.
///
/// All collaborators are injected, so one indexer can be shared by a
/// scheduled job and ad-hoc "re-index this file" calls. Two attempts on
/// the same `(collection, file)` never run at the same time; the second
/// one is rejected without touching stored state.
pub struct FileIndexer {
    source: Arc<dyn ContentSource>,
    embedder: EmbeddingBatcher,
    chunks: Arc<dyn ChunkStore>,
    state: Arc<dyn IndexStateStore>,
    chunker: Chunker,
    in_flight: Mutex<HashSet<FileKey>>,
}

impl FileIndexer {
    pub fn new(
        source: Arc<dyn ContentSource>,
        embedder: EmbeddingBatcher,
        chunks: Arc<dyn ChunkStore>,
        state: Arc<dyn IndexStateStore>,
        chunker: Chunker,
    ) -> Self {
        Self {
            source,
            embedder,
            chunks,
            state,
            chunker,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn chunker(&self) -> Chunker {
        self.chunker
    }

    /// Index one file of `collection`.
    ///
    /// File-level failures come back as `Ok` with `success == false` after
    /// the record is marked failed. `Err` means the index state itself could
    /// not be written.
    pub async fn index_file(
        &self,
        collection: &str,
        file_id: &str,
        file_path: Option<&str>,
    ) -> Result<FileIndexResult> {
        let _guard = match InFlightGuard::acquire(&self.in_flight, collection, file_id) {
            Some(guard) => guard,
            None => {
                let err = IndexError::Busy(file_id.to_string());
                warn!(collection, file_id, "skipping file: already being indexed");
                return Ok(FileIndexResult::failed(collection, file_id, err.to_string()));
            }
        };

        info!(collection, file_id, "indexing file");

        let previous = self
            .state
            .get_record(collection, file_id)
            .await
            .map_err(IndexError::persistence)?;
        let path = file_path
            .map(str::to_string)
            .or_else(|| previous.as_ref().and_then(|r| r.file_path.clone()))
            .unwrap_or_default();

        self.write_state(
            collection,
            file_id,
            IndexStatus::Pending,
            previous.as_ref().map_or(0, |r| r.chunk_count),
            None,
            file_path,
        )
        .await?;

        match self.run(collection, file_id, &path).await {
            Ok(count) => {
                self.write_state(
                    collection,
                    file_id,
                    IndexStatus::Indexed,
                    count as i64,
                    None,
                    file_path,
                )
                .await?;
                info!(collection, file_id, chunks = count, "indexed file");
                Ok(FileIndexResult::indexed(collection, file_id, count))
            }
            Err(err) => {
                let message = err.to_string();
                warn!(collection, file_id, error = %message, "failed to index file");
                self.write_state(
                    collection,
                    file_id,
                    IndexStatus::Failed,
                    0,
                    Some(message.clone()),
                    file_path,
                )
                .await?;
                Ok(FileIndexResult::failed(collection, file_id, message))
            }
        }
    }

    async fn run(&self, collection: &str, file_id: &str, path: &str) -> Result<usize> {
        let text = self
            .source
            .fetch_file_text(file_id)
            .await
            .map_err(|e| IndexError::SourceFetch {
                file_id: file_id.to_string(),
                message: format!("{:#}", e),
            })?;

        let pieces = self.chunker.split(&text);
        if pieces.is_empty() {
            let removed = self
                .chunks
                .delete_chunks(collection, file_id)
                .await
                .map_err(IndexError::persistence)?;
            debug!(collection, file_id, removed, "cleared chunks of empty file");
            return Err(IndexError::EmptyContent);
        }
        debug!(collection, file_id, chunks = pieces.len(), "split file");

        let texts: Vec<String> = pieces.iter().map(|p| p.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let now = Utc::now();
        let rows: Vec<Chunk> = pieces
            .into_iter()
            .zip(vectors)
            .map(|(piece, embedding)| Chunk {
                collection: collection.to_string(),
                source_file_id: file_id.to_string(),
                chunk_index: piece.index,
                metadata: ChunkMetadata {
                    file_path: path.to_string(),
                    tokens: piece.approx_tokens,
                    date_indexed: now,
                    content_hash: hash_text(&piece.text),
                },
                text: piece.text,
                embedding,
            })
            .collect();

        self.chunks
            .replace_chunks(collection, file_id, &rows)
            .await
            .map_err(IndexError::persistence)?;

        Ok(rows.len())
    }

    async fn write_state(
        &self,
        collection: &str,
        file_id: &str,
        status: IndexStatus,
        chunk_count: i64,
        error: Option<String>,
        file_path: Option<&str>,
    ) -> Result<()> {
        self.state
            .upsert_record(&IndexUpdate {
                collection,
                source_file_id: file_id,
                status,
                chunk_count,
                error,
                file_path,
                at: Utc::now(),
            })
            .await
            .map_err(IndexError::persistence)?;
        Ok(())
    }
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Marks a `(collection, file)` pair as in flight until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<FileKey>>,
    key: FileKey,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<FileKey>>, collection: &str, file_id: &str) -> Option<Self> {
        let key = (collection.to_string(), file_id.to_string());
        let mut active = set.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.clone()) {
            return None;
        }
        Some(Self { set, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.set.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.key);
    }
}
