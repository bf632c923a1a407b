//! Similarity query over one collection.
//!
//! The query path depends only on the embedding batcher (for the query
//! vector) and the [`ChunkStore`] (for candidate vectors). Every chunk of
//! the collection is scored, so latency grows linearly with collection size.
//!
//! # Ranking
//!
//! 1. Embed the query text with [`EmbeddingBatcher::embed_one`].
//! 2. Score every stored chunk by cosine similarity.
//! 3. Drop chunks whose vector length differs from the query vector or
//!    whose vector holds non-finite values.
//! 4. Sort by score (desc), chunk index (asc), source file id (asc).
//! 5. Truncate to `top_k`.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::embedding::{cosine_similarity, EmbeddingBatcher};
use crate::error::{IndexError, Result};
use crate::models::ScoredChunk;
use crate::store::ChunkStore;

/// Number of hits returned when the caller does not ask for a count.
pub const DEFAULT_TOP_K: usize = 5;

/// Read-only similarity search over stored chunks.
#[derive(Clone)]
pub struct QueryEngine {
    embedder: EmbeddingBatcher,
    store: Arc<dyn ChunkStore>,
}

impl QueryEngine {
    pub fn new(embedder: EmbeddingBatcher, store: Arc<dyn ChunkStore>) -> Self {
        Self { embedder, store }
    }

    /// Return the `top_k` chunks of `collection` most similar to `text`.
    ///
    /// A blank query or `top_k == 0` returns an empty list without calling
    /// the embedding provider.
    pub async fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if text.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_one(text).await?;
        let candidates = self
            .store
            .list_chunks(collection)
            .await
            .map_err(IndexError::persistence)?;
        let total = candidates.len();

        let mut mismatched = 0usize;
        let mut invalid = 0usize;
        let mut scored: Vec<ScoredChunk> = Vec::with_capacity(total);
        for chunk in candidates {
            match cosine_similarity(&query_vec, &chunk.embedding) {
                Ok(score) => scored.push(ScoredChunk { chunk, score }),
                Err(IndexError::DimensionMismatch { .. }) => mismatched += 1,
                Err(_) => invalid += 1,
            }
        }

        if mismatched > 0 {
            warn!(
                collection,
                mismatched,
                expected = query_vec.len(),
                "excluded chunks with mismatched embedding dimensions"
            );
        }
        if invalid > 0 {
            warn!(collection, invalid, "excluded chunks with non-finite embeddings");
        }

        scored.sort_by(rank);
        scored.truncate(top_k);

        debug!(collection, candidates = total, hits = scored.len(), "query ranked");
        Ok(scored)
    }
}

fn rank(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
        .then_with(|| a.chunk.source_file_id.cmp(&b.chunk.source_file_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::models::{Chunk, ChunkMetadata};
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Embeds every query as the same fixed vector.
    struct FixedEmbedder {
        vector: Vec<f32>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            self.vector.len()
        }
        async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }
    }

    fn chunk(file: &str, index: i64, embedding: Vec<f32>) -> Chunk {
        Chunk {
            collection: "docs".to_string(),
            source_file_id: file.to_string(),
            chunk_index: index,
            text: format!("{}#{}", file, index),
            embedding,
            metadata: ChunkMetadata {
                file_path: String::new(),
                tokens: 1,
                date_indexed: Utc::now(),
                content_hash: String::new(),
            },
        }
    }

    async fn engine(chunks: Vec<Chunk>) -> (QueryEngine, Arc<FixedEmbedder>) {
        let store = Arc::new(InMemoryStore::new());
        let mut by_file: std::collections::BTreeMap<String, Vec<Chunk>> = Default::default();
        for c in chunks {
            by_file.entry(c.source_file_id.clone()).or_default().push(c);
        }
        for (file, rows) in by_file {
            store.replace_chunks("docs", &file, &rows).await.unwrap();
        }
        let embedder = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0],
            calls: AtomicUsize::new(0),
        });
        let batcher = EmbeddingBatcher::new(embedder.clone(), 100);
        (QueryEngine::new(batcher, store), embedder)
    }

    #[tokio::test]
    async fn test_results_sorted_by_score_desc() {
        let (engine, _) = engine(vec![
            chunk("a", 0, vec![0.0, 1.0]),
            chunk("a", 1, vec![1.0, 0.0]),
            chunk("b", 0, vec![1.0, 1.0]),
            chunk("b", 1, vec![-1.0, 0.0]),
        ])
        .await;

        let hits = engine.query("docs", "hello", 10).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["a#1", "b#0", "a#0", "b#1"]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!((hits[3].score + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ties_break_by_chunk_index() {
        let (engine, _) = engine(vec![
            chunk("a", 2, vec![2.0, 0.0]),
            chunk("b", 0, vec![1.0, 0.0]),
            chunk("a", 1, vec![3.0, 0.0]),
        ])
        .await;

        let hits = engine.query("docs", "hello", 3).await.unwrap();
        let order: Vec<i64> = hits.iter().map(|h| h.chunk.chunk_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_top_k_truncates() {
        let (engine, _) = engine((0..10).map(|i| chunk("a", i, vec![1.0, 0.0])).collect()).await;
        assert_eq!(engine.query("docs", "hello", 3).await.unwrap().len(), 3);
        assert_eq!(engine.query("docs", "hello", 50).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_zero_vector_scores_zero() {
        let (engine, _) = engine(vec![chunk("a", 0, vec![0.0, 0.0])]).await;
        let hits = engine.query("docs", "hello", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 0.0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_excluded() {
        let (engine, _) = engine(vec![
            chunk("a", 0, vec![1.0, 0.0, 0.0]),
            chunk("b", 0, vec![1.0, 0.0]),
        ])
        .await;
        let hits = engine.query("docs", "hello", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source_file_id, "b");
    }

    #[tokio::test]
    async fn test_non_finite_vectors_are_excluded() {
        let chunks = (0..40)
            .map(|i| {
                let v = match i % 3 {
                    0 => vec![f32::NAN, 0.0],
                    1 => vec![1.0, i as f32],
                    _ => vec![f32::INFINITY, 1.0],
                };
                chunk("a", i, v)
            })
            .collect();
        let (engine, _) = engine(chunks).await;

        let hits = engine.query("docs", "q", 10).await.unwrap();
        assert_eq!(hits.len(), 10);
        assert!(hits.iter().all(|h| h.chunk.chunk_index % 3 == 1));
        assert!(hits.iter().all(|h| h.score.is_finite()));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(hits[0].chunk.chunk_index, 1);
    }

    #[tokio::test]
    async fn test_blank_query_skips_embedding() {
        let (engine, embedder) = engine(vec![chunk("a", 0, vec![1.0, 0.0])]).await;
        assert!(engine.query("docs", "   ", 5).await.unwrap().is_empty());
        assert!(engine.query("docs", "hello", 0).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let (engine, _) = engine(vec![chunk("a", 0, vec![1.0, 0.0])]).await;
        assert!(engine.query("nope", "hello", 5).await.unwrap().is_empty());
    }
}
