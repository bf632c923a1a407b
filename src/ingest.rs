//! Indexing orchestration.
//!
//! [`CollectionWalker`] indexes every indexable file of one collection;
//! [`IndexingJob`] runs the walker over a set of collections and sums the
//! counts into a [`JobSummary`].
//!
//! Collections run sequentially, and so do the files within a collection,
//! with a fixed pause between files. Failures are isolated: a file failure
//! is counted and the walk continues, and a collection failure is counted
//! and the job continues. Only a lost index-state store aborts the job.
//!
//! Both levels check a [`CancellationToken`] between units of work, so a
//! cancelled job stops after the file in flight and leaves every file
//! either fully indexed or in its prior state.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use knowledge_index_core::error::{IndexError, Result};
use knowledge_index_core::indexer::FileIndexer;
use knowledge_index_core::models::{
    Collection, CollectionSummary, FileIndexResult, JobSummary, SourceFile,
};
use knowledge_index_core::source::ContentSource;

use crate::config::IndexingConfig;

/// Listing and pacing settings for a walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub page_size: usize,
    pub file_delay: Duration,
    pub indexable_mime_types: Vec<String>,
}

impl From<&IndexingConfig> for WalkOptions {
    fn from(config: &IndexingConfig) -> Self {
        Self {
            page_size: config.page_size,
            file_delay: Duration::from_millis(config.file_delay_ms),
            indexable_mime_types: config.indexable_mime_types.clone(),
        }
    }
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::from(&IndexingConfig::default())
    }
}

impl WalkOptions {
    /// Files without a reported MIME type are indexed.
    pub fn is_indexable(&self, mime_type: Option<&str>) -> bool {
        match mime_type {
            None => true,
            Some(m) => self.indexable_mime_types.iter().any(|t| t == m),
        }
    }
}

/// Indexes all files of one collection folder.
pub struct CollectionWalker {
    source: Arc<dyn ContentSource>,
    indexer: Arc<FileIndexer>,
    options: WalkOptions,
}

impl CollectionWalker {
    pub fn new(source: Arc<dyn ContentSource>, indexer: Arc<FileIndexer>, options: WalkOptions) -> Self {
        Self {
            source,
            indexer,
            options,
        }
    }

    pub fn indexer(&self) -> &Arc<FileIndexer> {
        &self.indexer
    }

    pub async fn run(&self, collection: &Collection) -> Result<CollectionSummary> {
        self.run_with_cancel(collection, &CancellationToken::new())
            .await
    }

    /// Walk `collection`, stopping early once `cancel` fires.
    ///
    /// An unconfigured collection yields zero counts. A listing failure is
    /// returned as [`IndexError::Listing`] before any file is touched.
    pub async fn run_with_cancel(
        &self,
        collection: &Collection,
        cancel: &CancellationToken,
    ) -> Result<CollectionSummary> {
        let mut summary = CollectionSummary::default();

        let folder = match collection.folder.as_deref() {
            Some(folder) => folder,
            None => {
                warn!(collection = %collection.name, "collection has no folder configured, skipping");
                return Ok(summary);
            }
        };

        let files = self.list_all(folder).await?;
        info!(
            collection = %collection.name,
            source = self.source.name(),
            files = files.len(),
            "walking collection"
        );

        let mut indexed_any = false;
        for file in files {
            if cancel.is_cancelled() {
                info!(collection = %collection.name, "walk cancelled");
                break;
            }
            if !self.options.is_indexable(file.mime_type.as_deref()) {
                debug!(
                    collection = %collection.name,
                    file_id = %file.id,
                    mime_type = file.mime_type.as_deref().unwrap_or(""),
                    "skipping non-indexable file"
                );
                summary.files_seen += 1;
                summary.skipped += 1;
                continue;
            }

            if indexed_any && !self.pause(cancel).await {
                break;
            }
            indexed_any = true;
            summary.files_seen += 1;

            let result = self
                .indexer
                .index_file(&collection.name, &file.id, Some(&file.name))
                .await?;
            if result.success {
                summary.indexed += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(
            collection = %collection.name,
            seen = summary.files_seen,
            indexed = summary.indexed,
            failed = summary.failed,
            skipped = summary.skipped,
            "collection done"
        );
        Ok(summary)
    }

    /// Follow page tokens until the listing is exhausted.
    async fn list_all(&self, folder: &str) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .source
                .list_files_in_folder(folder, self.options.page_size, token.as_deref())
                .await
                .map_err(|e| IndexError::Listing {
                    folder: folder.to_string(),
                    message: format!("{}: {:#}", self.source.name(), e),
                })?;
            files.extend(page.items);

            match page.next_page_token {
                Some(next) if token.as_deref() != Some(next.as_str()) => token = Some(next),
                _ => break,
            }
        }

        Ok(files)
    }

    /// Sleep between files. Returns `false` if cancelled while waiting.
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        if self.options.file_delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.options.file_delay) => true,
        }
    }
}

/// Runs the walker over configured collections.
pub struct IndexingJob {
    walker: CollectionWalker,
    collections: Vec<Collection>,
}

impl IndexingJob {
    pub fn new(walker: CollectionWalker, collections: Vec<Collection>) -> Self {
        Self {
            walker,
            collections,
        }
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Index the named collections, or every configured one when `names`
    /// is `None` or empty. Unknown names are logged and skipped.
    ///
    /// Returns `Err` only when index state can no longer be written.
    pub async fn run(
        &self,
        names: Option<&[String]>,
        cancel: CancellationToken,
    ) -> Result<JobSummary> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("indexing_job", run_id = %run_id);
        self.run_inner(run_id, names, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: String,
        names: Option<&[String]>,
        cancel: CancellationToken,
    ) -> Result<JobSummary> {
        let mut summary = JobSummary {
            run_id,
            ..Default::default()
        };

        let selected = self.select(names);
        info!(collections = selected.len(), "indexing job started");

        for collection in selected {
            if cancel.is_cancelled() {
                break;
            }
            summary.collections += 1;

            match self.walker.run_with_cancel(collection, &cancel).await {
                Ok(counts) => summary.add(&counts),
                Err(e) if e.is_fatal() => {
                    error!(collection = %collection.name, error = %e, "index state unavailable, aborting job");
                    return Err(e);
                }
                Err(e) => {
                    error!(collection = %collection.name, error = %e, "collection failed");
                    summary.failed += 1;
                    summary.failed_collections += 1;
                }
            }
        }

        summary.cancelled = cancel.is_cancelled();
        info!(
            total = summary.total_files,
            indexed = summary.indexed,
            failed = summary.failed,
            skipped = summary.skipped,
            failed_collections = summary.failed_collections,
            cancelled = summary.cancelled,
            "indexing job finished"
        );
        Ok(summary)
    }

    fn select(&self, names: Option<&[String]>) -> Vec<&Collection> {
        match names {
            Some(names) if !names.is_empty() => names
                .iter()
                .filter_map(|name| {
                    let found = self.collections.iter().find(|c| &c.name == name);
                    if found.is_none() {
                        warn!(collection = %name, "unknown collection, skipping");
                    }
                    found
                })
                .collect(),
            _ => self.collections.iter().collect(),
        }
    }

    /// Re-index one file of a configured collection, outside any job run.
    pub async fn index_single_file(
        &self,
        file_id: &str,
        collection: &str,
        file_path: Option<&str>,
    ) -> Result<FileIndexResult> {
        if !self.collections.iter().any(|c| c.name == collection) {
            return Err(IndexError::UnknownCollection(collection.to_string()));
        }
        self.walker
            .indexer()
            .index_file(collection, file_id, file_path)
            .await
    }
}
