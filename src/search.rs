//! `kidx query`: similarity search over one collection.

use anyhow::{bail, Result};

use knowledge_index_core::models::ScoredChunk;

use crate::config::Config;
use crate::services;

/// Longest snippet printed per hit, in characters.
const SNIPPET_CHARS: usize = 240;

pub async fn run_query(
    config: &Config,
    collection: &str,
    text: &str,
    top_k: Option<usize>,
) -> Result<()> {
    if !config.collections.iter().any(|c| c.name == collection) {
        bail!("Unknown collection: '{}'", collection);
    }
    if text.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let (engine, store) = services::query_engine(config).await?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let outcome = engine.query(collection, text, top_k).await;
    store.pool().close().await;
    let hits = outcome?;

    if hits.is_empty() {
        println!("No results.");
    }
    for (rank, hit) in hits.iter().enumerate() {
        print_hit(rank + 1, hit);
    }

    Ok(())
}

fn print_hit(rank: usize, hit: &ScoredChunk) {
    let chunk = &hit.chunk;
    let origin = if chunk.metadata.file_path.is_empty() {
        chunk.source_file_id.as_str()
    } else {
        chunk.metadata.file_path.as_str()
    };
    println!(
        "{}. [{:.4}] {} #{}",
        rank, hit.score, origin, chunk.chunk_index
    );
    println!("    {}", snippet(&chunk.text));
}

/// Single-line excerpt of `text`, cut on a char boundary.
pub fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}
