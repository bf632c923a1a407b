//! `kidx status`: per-file index records.

use anyhow::Result;

use knowledge_index_core::models::IndexStatus;
use knowledge_index_core::store::IndexStateStore;

use crate::config::Config;
use crate::services;

pub async fn run_status(config: &Config, collection: Option<&str>) -> Result<()> {
    let store = services::open_store(config).await?;
    let outcome = store.list_records(collection).await;
    store.pool().close().await;
    let records = outcome?;

    if records.is_empty() {
        println!("No index records.");
        return Ok(());
    }

    println!(
        "{:<20} {:<32} {:<8} {:>6}  {:<20} ERROR",
        "COLLECTION", "FILE", "STATUS", "CHUNKS", "LAST INDEXED"
    );
    for r in &records {
        let file = r.file_path.as_deref().unwrap_or(&r.source_file_id);
        println!(
            "{:<20} {:<32} {:<8} {:>6}  {:<20} {}",
            r.collection,
            file,
            r.status,
            r.chunk_count,
            r.last_indexed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.error.as_deref().unwrap_or("")
        );
    }

    let count = |s: IndexStatus| records.iter().filter(|r| r.status == s).count();
    println!(
        "\n{} files: {} indexed, {} failed, {} pending",
        records.len(),
        count(IndexStatus::Indexed),
        count(IndexStatus::Failed),
        count(IndexStatus::Pending)
    );

    Ok(())
}
