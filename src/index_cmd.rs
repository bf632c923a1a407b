//! `kidx index` and `kidx index-file`.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use knowledge_index_core::models::JobSummary;

use crate::config::Config;
use crate::services;

/// Run the indexing job over `collections` (all when empty).
///
/// Ctrl-C cancels the job after the file in flight.
pub async fn run_index(config: &Config, collections: &[String]) -> Result<JobSummary> {
    let (job, store) = services::indexing_job(config).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after current file");
            on_signal.cancel();
        }
    });

    let names = (!collections.is_empty()).then_some(collections);
    let outcome = job.run(names, cancel).await;
    store.pool().close().await;
    let summary = outcome.context("Indexing job aborted")?;

    println!("index run {}", summary.run_id);
    println!("  collections: {}", summary.collections);
    println!("  files seen: {}", summary.total_files);
    println!("  indexed: {}", summary.indexed);
    println!("  failed: {}", summary.failed);
    println!("  skipped: {}", summary.skipped);
    if summary.failed_collections > 0 {
        println!("  failed collections: {}", summary.failed_collections);
    }
    println!("{}", if summary.cancelled { "cancelled" } else { "ok" });

    Ok(summary)
}

/// Re-index a single file of `collection`.
pub async fn run_index_file(
    config: &Config,
    collection: &str,
    file_id: &str,
    file_path: Option<&str>,
) -> Result<()> {
    let (job, store) = services::indexing_job(config).await?;
    let outcome = job.index_single_file(file_id, collection, file_path).await;
    store.pool().close().await;
    let result = outcome?;

    if result.success {
        println!(
            "indexed {} ({} chunks)",
            result.source_file_id, result.chunks_indexed
        );
    } else {
        println!(
            "failed {}: {}",
            result.source_file_id,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}
