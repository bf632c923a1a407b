//! Embedding seam, batching, and vector utilities.
//!
//! [`Embedder`] is the single-call contract every provider implements
//! (OpenAI, Ollama, local models, test doubles). [`EmbeddingBatcher`]
//! wraps an injected embedder and splits large inputs into fixed-size
//! groups so each provider call stays under the API's batch limit.
//!
//! Concrete providers live in the `knowledge-index` app crate.

use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{IndexError, Result};

/// Conservative number of inputs per provider call.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// A text-to-vector backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed `texts` in a single provider call.
    ///
    /// Must return exactly one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>>;
}

/// Splits embedding work into provider-sized batches.
///
/// Any failing batch fails the whole call; partial results are never
/// returned. Callers decide how to isolate the failure.
#[derive(Clone)]
pub struct EmbeddingBatcher {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl EmbeddingBatcher {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed all `texts`, preserving length and order.
    ///
    /// Every vector must have the provider's declared dimensionality and
    /// only finite values; otherwise the whole call fails.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for (batch_no, batch) in texts.chunks(self.batch_size).enumerate() {
            let got = self.embedder.embed_batch(batch).await.map_err(|e| {
                warn!(
                    model = self.embedder.model_name(),
                    batch = batch_no,
                    size = batch.len(),
                    error = %e,
                    "embedding batch failed"
                );
                IndexError::Embedding(format!("{:#}", e))
            })?;

            if got.len() != batch.len() {
                return Err(IndexError::Embedding(format!(
                    "provider returned {} vectors for {} inputs",
                    got.len(),
                    batch.len()
                )));
            }
            check_vectors(&got, self.embedder.dims())?;

            debug!(batch = batch_no, size = batch.len(), "embedded batch");
            vectors.extend(got);
        }

        Ok(vectors)
    }

    /// Embed a single text, e.g. a search query.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::Embedding("empty embedding response".to_string()))
    }
}

fn check_vectors(vectors: &[Vec<f32>], dims: usize) -> Result<()> {
    for v in vectors {
        if v.len() != dims {
            return Err(IndexError::DimensionMismatch {
                expected: dims,
                actual: v.len(),
            });
        }
        if !is_finite_vector(v) {
            return Err(IndexError::NonFiniteVector);
        }
    }
    Ok(())
}

/// `true` when no component is `NaN` or infinite.
pub fn is_finite_vector(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use knowledge_index_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB produced by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. A zero-magnitude (or empty) vector
/// scores `0.0` rather than `NaN`. Vectors of different lengths come from
/// different model versions and are rejected, as are vectors holding
/// `NaN` or infinite components.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(IndexError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    if !is_finite_vector(a) || !is_finite_vector(b) {
        return Err(IndexError::NonFiniteVector);
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return Ok(0.0);
    }

    let score = dot / denom;
    if !score.is_finite() {
        return Err(IndexError::NonFiniteVector);
    }
    Ok(score.clamp(-1.0, 1.0) as f32)
}
