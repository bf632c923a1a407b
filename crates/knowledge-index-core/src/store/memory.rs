//! In-memory store for tests and embedded use.
//!
//! Chunks are grouped per `(collection, file)` behind one `RwLock`, so a
//! replacement swaps the whole group under a single write guard and readers
//! never see a mixed set.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{Chunk, IndexRecord, IndexUpdate};

use super::{ChunkStore, IndexStateStore};

type FileKey = (String, String);

/// In-memory implementation of [`ChunkStore`] and [`IndexStateStore`].
pub struct InMemoryStore {
    chunks: RwLock<BTreeMap<FileKey, Vec<Chunk>>>,
    records: RwLock<BTreeMap<FileKey, IndexRecord>>,
    fail_chunk_writes: AtomicBool,
    fail_record_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(BTreeMap::new()),
            records: RwLock::new(BTreeMap::new()),
            fail_chunk_writes: AtomicBool::new(false),
            fail_record_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent chunk writes fail, simulating a store outage.
    pub fn set_chunk_writes_failing(&self, failing: bool) {
        self.fail_chunk_writes.store(failing, Ordering::SeqCst);
    }

    /// Make subsequent index-record writes fail, simulating a store outage.
    pub fn set_record_writes_failing(&self, failing: bool) {
        self.fail_record_writes.store(failing, Ordering::SeqCst);
    }

    fn check_chunk_writes(&self) -> Result<()> {
        if self.fail_chunk_writes.load(Ordering::SeqCst) {
            bail!("chunk store unavailable");
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key(collection: &str, source_file_id: &str) -> FileKey {
    (collection.to_string(), source_file_id.to_string())
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn replace_chunks(
        &self,
        collection: &str,
        source_file_id: &str,
        chunks: &[Chunk],
    ) -> Result<()> {
        self.check_chunk_writes()?;
        let mut sorted = chunks.to_vec();
        sorted.sort_by_key(|c| c.chunk_index);

        let mut stored = self.chunks.write().map_err(poisoned)?;
        if sorted.is_empty() {
            stored.remove(&key(collection, source_file_id));
        } else {
            stored.insert(key(collection, source_file_id), sorted);
        }
        Ok(())
    }

    async fn delete_chunks(&self, collection: &str, source_file_id: &str) -> Result<u64> {
        self.check_chunk_writes()?;
        let mut stored = self.chunks.write().map_err(poisoned)?;
        Ok(stored
            .remove(&key(collection, source_file_id))
            .map(|v| v.len() as u64)
            .unwrap_or(0))
    }

    async fn list_chunks(&self, collection: &str) -> Result<Vec<Chunk>> {
        let stored = self.chunks.read().map_err(poisoned)?;
        Ok(stored
            .iter()
            .filter(|((c, _), _)| c == collection)
            .flat_map(|(_, chunks)| chunks.iter().cloned())
            .collect())
    }

    async fn count_chunks(&self, collection: &str, source_file_id: &str) -> Result<i64> {
        let stored = self.chunks.read().map_err(poisoned)?;
        Ok(stored
            .get(&key(collection, source_file_id))
            .map(|v| v.len() as i64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl IndexStateStore for InMemoryStore {
    async fn upsert_record(&self, update: &IndexUpdate<'_>) -> Result<IndexRecord> {
        if self.fail_record_writes.load(Ordering::SeqCst) {
            bail!("index state store unavailable");
        }

        let mut records = self.records.write().map_err(poisoned)?;
        let k = key(update.collection, update.source_file_id);
        let file_path = update
            .file_path
            .map(str::to_string)
            .or_else(|| records.get(&k).and_then(|r| r.file_path.clone()));

        let record = IndexRecord {
            collection: update.collection.to_string(),
            source_file_id: update.source_file_id.to_string(),
            status: update.status,
            chunk_count: update.chunk_count,
            last_indexed_at: update.at,
            updated_at: update.at,
            error: update.error.clone(),
            file_path,
        };
        records.insert(k, record.clone());
        Ok(record)
    }

    async fn get_record(
        &self,
        collection: &str,
        source_file_id: &str,
    ) -> Result<Option<IndexRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(&key(collection, source_file_id)).cloned())
    }

    async fn list_records(&self, collection: Option<&str>) -> Result<Vec<IndexRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .filter(|r| collection.map_or(true, |c| r.collection == c))
            .cloned()
            .collect())
    }
}
