//! Core data models shared by the indexing and retrieval paths.
//!
//! These types describe collections, the external files they group, the
//! chunks stored for each file, and the per-file index bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named bucket of documents indexed together.
///
/// Collections are owned by configuration; the indexer never creates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Unique key (e.g. `"launch_packs"`).
    pub name: String,
    /// External folder reference. `None` means the collection is unconfigured.
    pub folder: Option<String>,
    /// Human-readable label.
    pub label: String,
}

impl Collection {
    pub fn new(name: impl Into<String>, folder: Option<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: folder.filter(|f| !f.trim().is_empty()),
            label: label.into(),
        }
    }
}

/// A document owned by the external content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Opaque external identifier.
    pub id: String,
    /// Display name or path.
    pub name: String,
    /// MIME type, when the source reports one.
    pub mime_type: Option<String>,
    /// Last modification time, when the source reports one.
    pub modified_time: Option<DateTime<Utc>>,
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default)]
pub struct FilePage {
    pub items: Vec<SourceFile>,
    pub next_page_token: Option<String>,
}

/// A text segment produced by the chunker, before embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: i64,
    pub text: String,
    pub approx_tokens: usize,
}

/// Metadata stored alongside every chunk row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Origin file path or display name (empty when unknown).
    pub file_path: String,
    /// Approximate token count of the chunk text.
    pub tokens: usize,
    /// When the chunk was written.
    pub date_indexed: DateTime<Utc>,
    /// SHA-256 of the chunk text.
    pub content_hash: String,
}

/// A persisted unit of indexed text, keyed by `(collection, source_file_id, chunk_index)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub collection: String,
    pub source_file_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Indexing status of one `(collection, file)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Pending,
    Indexed,
    Failed,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Pending => "pending",
            IndexStatus::Indexed => "indexed",
            IndexStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(IndexStatus::Pending),
            "indexed" => Ok(IndexStatus::Indexed),
            "failed" => Ok(IndexStatus::Failed),
            other => anyhow::bail!("unknown index status: '{}'", other),
        }
    }
}

/// Per-file bookkeeping row, one per `(collection, source_file_id)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRecord {
    pub collection: String,
    pub source_file_id: String,
    pub status: IndexStatus,
    pub chunk_count: i64,
    pub last_indexed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
    pub file_path: Option<String>,
}

/// A state transition written through the `IndexStateStore`.
///
/// `file_path: None` keeps whatever path was stored previously.
#[derive(Debug, Clone)]
pub struct IndexUpdate<'a> {
    pub collection: &'a str,
    pub source_file_id: &'a str,
    pub status: IndexStatus,
    pub chunk_count: i64,
    pub error: Option<String>,
    pub file_path: Option<&'a str>,
    pub at: DateTime<Utc>,
}

/// Outcome of indexing a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileIndexResult {
    pub success: bool,
    pub source_file_id: String,
    pub collection: String,
    pub chunks_indexed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileIndexResult {
    pub fn indexed(collection: &str, source_file_id: &str, chunks_indexed: usize) -> Self {
        Self {
            success: true,
            source_file_id: source_file_id.to_string(),
            collection: collection.to_string(),
            chunks_indexed,
            error: None,
        }
    }

    pub fn failed(collection: &str, source_file_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            source_file_id: source_file_id.to_string(),
            collection: collection.to_string(),
            chunks_indexed: 0,
            error: Some(error.into()),
        }
    }
}

/// Counters for one collection walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub files_seen: usize,
    pub indexed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Aggregate counters for one indexing job run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub run_id: String,
    pub total_files: usize,
    pub indexed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub collections: usize,
    pub failed_collections: usize,
    pub cancelled: bool,
}

impl JobSummary {
    pub fn add(&mut self, c: &CollectionSummary) {
        self.total_files += c.files_seen;
        self.indexed += c.indexed;
        self.failed += c.failed;
        self.skipped += c.skipped;
    }
}

/// A ranked query hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}
