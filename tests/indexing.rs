//! End-to-end indexing tests over the in-memory store.
//!
//! A static content source and deterministic embedders drive the full
//! walker → indexer → store path, including the failure policies.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use knowledge_index::ingest::{CollectionWalker, IndexingJob, WalkOptions};
use knowledge_index_core::chunk::Chunker;
use knowledge_index_core::embedding::{Embedder, EmbeddingBatcher};
use knowledge_index_core::error::IndexError;
use knowledge_index_core::indexer::FileIndexer;
use knowledge_index_core::models::{Collection, FilePage, IndexStatus, SourceFile};
use knowledge_index_core::query::QueryEngine;
use knowledge_index_core::source::ContentSource;
use knowledge_index_core::store::memory::InMemoryStore;
use knowledge_index_core::store::{ChunkStore, IndexStateStore};

// ─── Test doubles ───────────────────────────────────────────────────

/// Folder listings and file texts held in memory. A file whose text is
/// `None` fails to fetch; a folder in `broken` fails to list.
#[derive(Default)]
struct StaticSource {
    folders: RwLock<HashMap<String, Vec<SourceFile>>>,
    texts: RwLock<HashMap<String, Option<String>>>,
    broken: RwLock<HashSet<String>>,
    list_calls: AtomicUsize,
}

impl StaticSource {
    fn add(&self, folder: &str, id: &str, mime: Option<&str>, text: &str) {
        self.folders
            .write()
            .unwrap()
            .entry(folder.to_string())
            .or_default()
            .push(SourceFile {
                id: id.to_string(),
                name: format!("{}.name", id),
                mime_type: mime.map(str::to_string),
                modified_time: None,
            });
        self.set_text(id, Some(text));
    }

    fn set_text(&self, id: &str, text: Option<&str>) {
        self.texts
            .write()
            .unwrap()
            .insert(id.to_string(), text.map(str::to_string));
    }

    fn break_folder(&self, folder: &str) {
        self.broken.write().unwrap().insert(folder.to_string());
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn list_files_in_folder(
        &self,
        folder: &str,
        limit: usize,
        page_token: Option<&str>,
    ) -> Result<FilePage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.read().unwrap().contains(folder) {
            bail!("403 forbidden");
        }
        let files = self
            .folders
            .read()
            .unwrap()
            .get(folder)
            .cloned()
            .unwrap_or_default();
        let offset: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let end = (offset + limit).min(files.len());
        Ok(FilePage {
            items: files[offset..end].to_vec(),
            next_page_token: (end < files.len()).then(|| end.to_string()),
        })
    }

    async fn fetch_file_text(&self, file_id: &str) -> Result<String> {
        match self.texts.read().unwrap().get(file_id) {
            Some(Some(text)) => Ok(text.clone()),
            Some(None) => bail!("503 backend error"),
            None => bail!("404 not found: {}", file_id),
        }
    }
}

/// Deterministic 3-d embedding. Texts containing `POISON` fail, `NARROW`
/// yields 2-d vectors and `NANVEC` yields `NaN` components.
struct TestEmbedder {
    calls: AtomicUsize,
    cancel_after_call: Option<CancellationToken>,
}

impl TestEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            cancel_after_call: None,
        }
    }
}

#[async_trait]
impl Embedder for TestEmbedder {
    fn model_name(&self) -> &str {
        "test-embedder"
    }

    fn dims(&self) -> usize {
        3
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_after_call {
            token.cancel();
        }
        if texts.iter().any(|t| t.contains("POISON")) {
            return Err(anyhow!("429 rate limited"));
        }
        if texts.iter().any(|t| t.contains("NARROW")) {
            return Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect());
        }
        if texts.iter().any(|t| t.contains("NANVEC")) {
            return Ok(texts.iter().map(|_| vec![f32::NAN, 0.0, 1.0]).collect());
        }
        Ok(texts
            .iter()
            .map(|t| {
                let a = t.matches('a').count() as f32;
                let z = t.matches('z').count() as f32;
                vec![a, z, 1.0]
            })
            .collect())
    }
}

struct Harness {
    source: Arc<StaticSource>,
    store: Arc<InMemoryStore>,
    embedder: Arc<TestEmbedder>,
    job: IndexingJob,
}

fn harness_with(
    collections: Vec<Collection>,
    embedder: TestEmbedder,
    page_size: usize,
    chunker: Chunker,
) -> Harness {
    let source = Arc::new(StaticSource::default());
    let store = Arc::new(InMemoryStore::new());
    let embedder = Arc::new(embedder);

    let indexer = Arc::new(FileIndexer::new(
        source.clone(),
        EmbeddingBatcher::new(embedder.clone(), 100),
        store.clone(),
        store.clone(),
        chunker,
    ));
    let options = WalkOptions {
        page_size,
        file_delay: Duration::ZERO,
        ..WalkOptions::default()
    };
    let walker = CollectionWalker::new(source.clone(), indexer, options);

    Harness {
        source,
        store,
        embedder,
        job: IndexingJob::new(walker, collections),
    }
}

fn harness(collections: Vec<Collection>) -> Harness {
    harness_with(collections, TestEmbedder::new(), 1000, Chunker::new(4, 1))
}

fn docs() -> Collection {
    Collection::new("docs", Some("folder-docs".to_string()), "Docs")
}

const GOOD_TEXT: &str = "a banana and a papaya are both tasty";

// ─── Walker and job ─────────────────────────────────────────────────

#[tokio::test]
async fn test_mixed_collection_summary() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "good", Some("text/plain"), GOOD_TEXT);
    h.source.add("folder-docs", "bad", Some("text/csv"), "POISON,row");
    h.source.add("folder-docs", "image", Some("image/png"), "binary");

    let summary = h.job.run(None, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.indexed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.collections, 1);
    assert!(!summary.cancelled);
    assert!(!summary.run_id.is_empty());

    let good = h.store.get_record("docs", "good").await.unwrap().unwrap();
    assert_eq!(good.status, IndexStatus::Indexed);
    assert_eq!(good.chunk_count, h.store.count_chunks("docs", "good").await.unwrap());
    assert!(good.chunk_count > 0);
    assert_eq!(good.file_path.as_deref(), Some("good.name"));

    let bad = h.store.get_record("docs", "bad").await.unwrap().unwrap();
    assert_eq!(bad.status, IndexStatus::Failed);
    assert_eq!(bad.chunk_count, 0);
    assert!(bad.error.unwrap().contains("429"));

    assert!(h.store.get_record("docs", "image").await.unwrap().is_none());
}

#[tokio::test]
async fn test_docs_collection_with_empty_and_unsupported_files() {
    let h = harness_with(vec![docs()], TestEmbedder::new(), 1000, Chunker::new(2, 0));
    h.source
        .add("folder-docs", "a.txt", Some("text/plain"), "hello world, hello again");
    h.source.add("folder-docs", "b.txt", Some("text/plain"), "");
    h.source
        .add("folder-docs", "c.csv", Some("application/x-spreadsheet"), "x,y");

    let names = vec!["docs".to_string()];
    let summary = h
        .job
        .run(Some(&names), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.indexed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);

    assert!(h.store.count_chunks("docs", "a.txt").await.unwrap() >= 2);
    let empty = h.store.get_record("docs", "b.txt").await.unwrap().unwrap();
    assert_eq!(empty.error.as_deref(), Some("file is empty"));
}

#[tokio::test]
async fn test_file_without_mime_type_is_indexed() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "untyped", None, GOOD_TEXT);
    let summary = h.job.run(None, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.indexed, 1);
}

#[tokio::test]
async fn test_one_failing_file_does_not_stop_the_rest() {
    let h = harness(vec![docs()]);
    for i in 0..5 {
        let text = if i == 2 { "POISON" } else { GOOD_TEXT };
        h.source
            .add("folder-docs", &format!("f{}", i), Some("text/plain"), text);
    }
    let summary = h.job.run(None, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.indexed, 4);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_unconfigured_collection_is_skipped_not_failed() {
    let h = harness(vec![Collection::new("empty", None, "Empty")]);
    let summary = h.job.run(None, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.failed_collections, 0);
    assert_eq!(h.source.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_listing_failure_isolated_per_collection() {
    let other = Collection::new("other", Some("folder-other".to_string()), "Other");
    let h = harness(vec![docs(), other]);
    h.source.break_folder("folder-docs");
    h.source.add("folder-other", "o1", Some("text/plain"), GOOD_TEXT);

    let summary = h.job.run(None, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.collections, 2);
    assert_eq!(summary.failed_collections, 1);
    assert_eq!(summary.indexed, 1);
}

#[tokio::test]
async fn test_walker_reports_listing_error() {
    let h = harness(vec![docs()]);
    h.source.break_folder("folder-docs");
    let source: Arc<dyn ContentSource> = h.source.clone();
    let indexer = Arc::new(FileIndexer::new(
        source.clone(),
        EmbeddingBatcher::new(h.embedder.clone(), 100),
        h.store.clone(),
        h.store.clone(),
        Chunker::default(),
    ));
    let walker = CollectionWalker::new(source, indexer, WalkOptions::default());
    let err = walker.run(&docs()).await.unwrap_err();
    match err {
        IndexError::Listing { folder, message } => {
            assert_eq!(folder, "folder-docs");
            assert!(message.starts_with("static: 403"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_walker_follows_page_tokens() {
    let h = harness_with(vec![docs()], TestEmbedder::new(), 2, Chunker::new(4, 1));
    for i in 0..5 {
        h.source
            .add("folder-docs", &format!("f{}", i), Some("text/plain"), GOOD_TEXT);
    }
    let summary = h.job.run(None, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.indexed, 5);
    assert_eq!(h.source.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_named_collections_and_unknown_names() {
    let other = Collection::new("other", Some("folder-other".to_string()), "Other");
    let h = harness(vec![docs(), other]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);
    h.source.add("folder-other", "o1", Some("text/plain"), GOOD_TEXT);

    let names = vec!["other".to_string(), "missing".to_string()];
    let summary = h
        .job
        .run(Some(&names), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.collections, 1);
    assert_eq!(summary.indexed, 1);
    assert!(h.store.get_record("docs", "d1").await.unwrap().is_none());
    assert!(h.store.get_record("other", "o1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = h.job.run(None, cancel).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.collections, 0);
    assert!(h.store.list_records(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_stops_after_file_in_flight() {
    let cancel = CancellationToken::new();
    let embedder = TestEmbedder {
        calls: AtomicUsize::new(0),
        cancel_after_call: Some(cancel.clone()),
    };
    let h = harness_with(vec![docs()], embedder, 1000, Chunker::new(4, 1));
    for i in 0..3 {
        h.source
            .add("folder-docs", &format!("f{}", i), Some("text/plain"), GOOD_TEXT);
    }

    let summary = h.job.run(None, cancel).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.indexed, 1);
    assert_eq!(summary.total_files, 1);

    let records = h.store.list_records(Some("docs")).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, IndexStatus::Indexed);
}

#[tokio::test]
async fn test_lost_state_store_aborts_job() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);
    h.store.set_record_writes_failing(true);

    let err = h.job.run(None, CancellationToken::new()).await.unwrap_err();
    assert!(err.is_fatal());
}

// ─── Per-file policies ──────────────────────────────────────────────

#[tokio::test]
async fn test_reindex_replaces_without_duplicates() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);

    h.job.index_single_file("d1", "docs", None).await.unwrap();
    let first = h.store.get_record("docs", "d1").await.unwrap().unwrap();
    let first_chunks = h.store.list_chunks("docs").await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    h.job.index_single_file("d1", "docs", None).await.unwrap();
    let second = h.store.get_record("docs", "d1").await.unwrap().unwrap();
    let second_chunks = h.store.list_chunks("docs").await.unwrap();

    assert_eq!(h.store.list_records(None).await.unwrap().len(), 1);
    assert_eq!(first.chunk_count, second.chunk_count);
    assert_eq!(first_chunks.len(), second_chunks.len());
    assert!(second.last_indexed_at > first.last_indexed_at);

    let first_texts: Vec<&str> = first_chunks.iter().map(|c| c.text.as_str()).collect();
    let second_texts: Vec<&str> = second_chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(first_texts, second_texts);

    let indices: Vec<i64> = second_chunks.iter().map(|c| c.chunk_index).collect();
    let expected: Vec<i64> = (0..second_chunks.len() as i64).collect();
    assert_eq!(indices, expected);
}

#[tokio::test]
async fn test_shrinking_file_leaves_no_stale_chunks() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), &GOOD_TEXT.repeat(5));
    let big = h.job.index_single_file("d1", "docs", None).await.unwrap();

    h.source.set_text("d1", Some("short"));
    let small = h.job.index_single_file("d1", "docs", None).await.unwrap();

    assert!(big.chunks_indexed > small.chunks_indexed);
    assert_eq!(
        h.store.count_chunks("docs", "d1").await.unwrap(),
        small.chunks_indexed as i64
    );
}

#[tokio::test]
async fn test_fetch_failure_keeps_last_good_chunks() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);
    let ok = h.job.index_single_file("d1", "docs", None).await.unwrap();

    h.source.set_text("d1", None);
    let result = h.job.index_single_file("d1", "docs", None).await.unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("503"));

    let record = h.store.get_record("docs", "d1").await.unwrap().unwrap();
    assert_eq!(record.status, IndexStatus::Failed);
    assert_eq!(record.chunk_count, 0);
    assert_eq!(
        h.store.count_chunks("docs", "d1").await.unwrap(),
        ok.chunks_indexed as i64
    );
}

#[tokio::test]
async fn test_embedding_failure_keeps_last_good_chunks() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);
    h.job.index_single_file("d1", "docs", None).await.unwrap();

    h.source.set_text("d1", Some("POISON pill"));
    let result = h.job.index_single_file("d1", "docs", None).await.unwrap();
    assert!(!result.success);

    let chunks = h.store.list_chunks("docs").await.unwrap();
    assert!(!chunks.is_empty());
    assert!(chunks.iter().all(|c| !c.text.contains("POISON")));
}

#[tokio::test]
async fn test_wrong_width_embeddings_keep_last_good_chunks() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);
    let ok = h.job.index_single_file("d1", "docs", None).await.unwrap();

    h.source.set_text("d1", Some("NARROW model migration"));
    let result = h.job.index_single_file("d1", "docs", None).await.unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("dimension mismatch"));

    let record = h.store.get_record("docs", "d1").await.unwrap().unwrap();
    assert_eq!(record.status, IndexStatus::Failed);
    assert_eq!(record.chunk_count, 0);

    let chunks = h.store.list_chunks("docs").await.unwrap();
    assert_eq!(chunks.len(), ok.chunks_indexed);
    assert!(chunks.iter().all(|c| c.embedding.len() == 3));
    assert!(chunks.iter().all(|c| !c.text.contains("NARROW")));

    let engine = QueryEngine::new(
        EmbeddingBatcher::new(h.embedder.clone(), 100),
        h.store.clone(),
    );
    assert!(!engine.query("docs", "banana", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_finite_embeddings_keep_last_good_chunks() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);
    let ok = h.job.index_single_file("d1", "docs", None).await.unwrap();

    h.source.set_text("d1", Some("NANVEC"));
    let result = h.job.index_single_file("d1", "docs", None).await.unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("non-finite"));

    let chunks = h.store.list_chunks("docs").await.unwrap();
    assert_eq!(chunks.len(), ok.chunks_indexed);
    assert!(chunks.iter().all(|c| c.embedding.iter().all(|x| x.is_finite())));
}

#[tokio::test]
async fn test_empty_file_deletes_chunks() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);
    h.job.index_single_file("d1", "docs", None).await.unwrap();

    h.source.set_text("d1", Some("  \n\t "));
    let result = h.job.index_single_file("d1", "docs", None).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("file is empty"));

    let record = h.store.get_record("docs", "d1").await.unwrap().unwrap();
    assert_eq!(record.status, IndexStatus::Failed);
    assert_eq!(record.chunk_count, 0);
    assert_eq!(record.error.as_deref(), Some("file is empty"));
    assert_eq!(h.store.count_chunks("docs", "d1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_chunk_write_failure_marks_failed_and_keeps_old_set() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);
    let ok = h.job.index_single_file("d1", "docs", None).await.unwrap();

    h.store.set_chunk_writes_failing(true);
    let result = h.job.index_single_file("d1", "docs", None).await.unwrap();
    assert!(!result.success);

    let record = h.store.get_record("docs", "d1").await.unwrap().unwrap();
    assert_eq!(record.status, IndexStatus::Failed);
    assert_eq!(
        h.store.count_chunks("docs", "d1").await.unwrap(),
        ok.chunks_indexed as i64
    );
}

#[tokio::test]
async fn test_file_path_kept_when_not_supplied() {
    let h = harness(vec![docs()]);
    h.source.add("folder-docs", "d1", Some("text/plain"), GOOD_TEXT);
    h.job
        .index_single_file("d1", "docs", Some("Plans/launch.txt"))
        .await
        .unwrap();
    h.job.index_single_file("d1", "docs", None).await.unwrap();

    let record = h.store.get_record("docs", "d1").await.unwrap().unwrap();
    assert_eq!(record.file_path.as_deref(), Some("Plans/launch.txt"));
    let chunks = h.store.list_chunks("docs").await.unwrap();
    assert!(chunks.iter().all(|c| c.metadata.file_path == "Plans/launch.txt"));
}

#[tokio::test]
async fn test_single_file_requires_known_collection() {
    let h = harness(vec![docs()]);
    let err = h
        .job
        .index_single_file("d1", "nope", None)
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::UnknownCollection(_)));
}

#[tokio::test]
async fn test_large_file_embeds_in_batches() {
    let h = harness(vec![docs()]);
    // 16-char windows advancing by 12 chars: 250 windows.
    let text = "x".repeat(12 * 249 + 16);
    h.source.add("folder-docs", "big", Some("text/plain"), &text);

    let result = h.job.index_single_file("big", "docs", None).await.unwrap();
    assert!(result.success);
    assert_eq!(result.chunks_indexed, 250);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 3);
}

// ─── Concurrency guard ──────────────────────────────────────────────

/// Source whose fetch blocks until released.
struct GatedSource {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ContentSource for GatedSource {
    fn name(&self) -> &str {
        "gated"
    }

    async fn list_files_in_folder(
        &self,
        _folder: &str,
        _limit: usize,
        _page_token: Option<&str>,
    ) -> Result<FilePage> {
        Ok(FilePage::default())
    }

    async fn fetch_file_text(&self, _file_id: &str) -> Result<String> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(GOOD_TEXT.to_string())
    }
}

#[tokio::test]
async fn test_concurrent_attempt_on_same_file_is_rejected() {
    let source = Arc::new(GatedSource {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let store = Arc::new(InMemoryStore::new());
    let indexer = Arc::new(FileIndexer::new(
        source.clone(),
        EmbeddingBatcher::new(Arc::new(TestEmbedder::new()), 100),
        store.clone(),
        store.clone(),
        Chunker::new(4, 1),
    ));

    let background = indexer.clone();
    let first = tokio::spawn(async move { background.index_file("docs", "d1", None).await });
    source.entered.notified().await;

    let second = indexer.index_file("docs", "d1", None).await.unwrap();
    assert!(!second.success);
    assert!(second.error.unwrap().contains("already being indexed"));
    let record = store.get_record("docs", "d1").await.unwrap().unwrap();
    assert_eq!(record.status, IndexStatus::Pending);

    source.release.notify_one();
    let first = first.await.unwrap().unwrap();
    assert!(first.success);
    let record = store.get_record("docs", "d1").await.unwrap().unwrap();
    assert_eq!(record.status, IndexStatus::Indexed);
}

// ─── Query over indexed data ────────────────────────────────────────

#[tokio::test]
async fn test_query_ranks_indexed_chunks_within_collection() {
    let other = Collection::new("other", Some("folder-other".to_string()), "Other");
    let h = harness(vec![docs(), other]);
    h.source.add("folder-docs", "as", Some("text/plain"), "aaaaaaaaaaaaaaaa");
    h.source.add("folder-docs", "zs", Some("text/plain"), "zzzzzzzzzzzzzzzz");
    h.source.add("folder-other", "o1", Some("text/plain"), "aaaaaaaaaaaaaaaa");
    h.job.run(None, CancellationToken::new()).await.unwrap();

    let engine = QueryEngine::new(
        EmbeddingBatcher::new(h.embedder.clone(), 100),
        h.store.clone(),
    );
    let hits = engine.query("docs", "aaaa", 5).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.source_file_id, "as");
    assert!(hits[0].score > hits[1].score);
    assert!(hits.iter().all(|h| h.chunk.collection == "docs"));
}
