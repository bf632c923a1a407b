//! Sliding-window text chunker.
//!
//! Splits file text into overlapping [`TextChunk`]s sized in approximate
//! tokens. Tokens are estimated at a fixed 4 characters per token, so no
//! tokenizer is needed. Windows are measured in characters (not bytes), so
//! multi-byte text is never split inside a code point.
//!
//! Whitespace-only windows are dropped and indices are assigned in emission
//! order, so the returned indices are always `0..n` without gaps.

use crate::models::TextChunk;

/// Approximate chars-per-token ratio.
pub const CHARS_PER_TOKEN: usize = 4;

pub const DEFAULT_TARGET_TOKENS: usize = 500;
pub const DEFAULT_OVERLAP_TOKENS: usize = 50;

/// Chunking parameters, in approximate tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    pub target_tokens: usize,
    pub overlap_tokens: usize,
}

impl Chunker {
    pub fn new(target_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            target_tokens,
            overlap_tokens,
        }
    }

    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        split_text(text, self.target_tokens, self.overlap_tokens)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_TOKENS, DEFAULT_OVERLAP_TOKENS)
    }
}

/// Split `text` into windows of `target_tokens`, each starting
/// `target_tokens - overlap_tokens` after the previous one.
///
/// Returns an empty vector for empty or whitespace-only input and at least
/// one chunk otherwise. An overlap that is not smaller than the target is
/// clamped so the window always advances.
pub fn split_text(text: &str, target_tokens: usize, overlap_tokens: usize) -> Vec<TextChunk> {
    let target_chars = target_tokens.max(1) * CHARS_PER_TOKEN;
    let overlap_chars = (overlap_tokens * CHARS_PER_TOKEN).min(target_chars - 1);
    let step = target_chars - overlap_chars;

    // Byte offset of every char boundary, plus the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total_chars {
        let end = (start + target_chars).min(total_chars);
        let piece = &text[bounds[start]..bounds[end]];

        if !piece.trim().is_empty() {
            chunks.push(TextChunk {
                index: chunks.len() as i64,
                text: piece.to_string(),
                approx_tokens: (end - start).div_ceil(CHARS_PER_TOKEN),
            });
        }

        if end >= total_chars {
            break;
        }
        start += step;
    }

    chunks
}

/// Estimate the token count of `text` using [`CHARS_PER_TOKEN`].
pub fn approx_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}
