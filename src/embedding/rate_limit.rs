//! Token-bucket rate limiting for embedding providers.
//!
//! [`RateLimitedEmbedder`] wraps any [`Embedder`] and waits for a token
//! before each provider call, so the effective request rate never exceeds
//! `requests_per_minute` regardless of how files and batches are scheduled.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use knowledge_index_core::embedding::Embedder;

/// Classic token bucket: holds up to `capacity` tokens, refilled
/// continuously at `refill_per_sec`.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_sec: f64, now: Instant) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec,
            last: now,
        }
    }

    /// Bucket that allows `requests_per_minute`, bursting up to one second's worth.
    pub fn per_minute(requests_per_minute: u32, now: Instant) -> Self {
        let rpm = requests_per_minute.max(1);
        Self::new((rpm / 60).max(1), f64::from(rpm) / 60.0, now)
    }

    /// Take one token, or return how long to wait before one is available.
    pub fn try_take(&mut self, now: Instant) -> std::result::Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }

        let missing = 1.0 - self.tokens;
        Err(Duration::from_secs_f64(missing / self.refill_per_sec))
    }
}

/// Decorator that rate-limits calls to an inner [`Embedder`].
pub struct RateLimitedEmbedder {
    inner: Arc<dyn Embedder>,
    bucket: Mutex<TokenBucket>,
}

impl RateLimitedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, requests_per_minute: u32) -> Self {
        Self {
            inner,
            bucket: Mutex::new(TokenBucket::per_minute(requests_per_minute, Instant::now())),
        }
    }

    async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                match bucket.try_take(Instant::now()) {
                    Ok(()) => return,
                    Err(wait) => wait,
                }
            };
            debug!(wait_ms = wait.as_millis() as u64, "waiting for embedding rate limit");
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl Embedder for RateLimitedEmbedder {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dims(&self) -> usize {
        self.inner.dims()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.acquire().await;
        self.inner.embed_batch(texts).await
    }
}
