//! Wiring of stores, providers, and the pipeline from configuration.

use anyhow::{bail, Result};
use std::sync::Arc;

use knowledge_index_core::embedding::{Embedder, EmbeddingBatcher};
use knowledge_index_core::indexer::FileIndexer;
use knowledge_index_core::query::QueryEngine;
use knowledge_index_core::source::ContentSource;

use crate::config::{Config, SourceConfig};
use crate::connector_drive::DriveSource;
use crate::connector_fs::FsSource;
use crate::db;
use crate::embedding::create_embedder;
use crate::ingest::{CollectionWalker, IndexingJob, WalkOptions};
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Build the configured content source.
pub fn create_source(config: &SourceConfig) -> Result<Arc<dyn ContentSource>> {
    match config.provider.as_str() {
        "drive" => Ok(Arc::new(DriveSource::new(config)?)),
        "filesystem" => match &config.root {
            Some(root) => Ok(Arc::new(FsSource::new(root))),
            None => bail!("source.root is required when provider is 'filesystem'"),
        },
        other => bail!("Unknown source provider: {}", other),
    }
}

/// Assemble an [`IndexingJob`] from explicit collaborators.
pub fn build_job(
    config: &Config,
    source: Arc<dyn ContentSource>,
    embedder: Arc<dyn Embedder>,
    store: Arc<SqliteStore>,
) -> IndexingJob {
    let batcher = EmbeddingBatcher::new(embedder, config.embedding.batch_size);
    let indexer = Arc::new(FileIndexer::new(
        source.clone(),
        batcher,
        store.clone(),
        store,
        config.chunking.chunker(),
    ));
    let walker = CollectionWalker::new(source, indexer, WalkOptions::from(&config.indexing));
    IndexingJob::new(walker, config.resolved_collections())
}

/// Open the database as a store, creating missing tables.
pub async fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let pool = db::connect(config).await?;
    migrate::migrate(&pool).await?;
    Ok(Arc::new(SqliteStore::new(pool)))
}

/// Indexing job backed by the configured source, provider, and database.
pub async fn indexing_job(config: &Config) -> Result<(IndexingJob, Arc<SqliteStore>)> {
    let embedder = create_embedder(&config.embedding)?;
    let source = create_source(&config.source)?;
    let store = open_store(config).await?;
    Ok((build_job(config, source, embedder, store.clone()), store))
}

/// Query engine backed by the configured provider and database.
pub async fn query_engine(config: &Config) -> Result<(QueryEngine, Arc<SqliteStore>)> {
    let embedder = create_embedder(&config.embedding)?;
    let store = open_store(config).await?;
    let batcher = EmbeddingBatcher::new(embedder, config.embedding.batch_size);
    Ok((QueryEngine::new(batcher, store.clone()), store))
}
