//! Error taxonomy for the indexing and retrieval pipeline.

use thiserror::Error;

/// Errors raised by the indexer and query engine.
///
/// Only [`IndexError::Persistence`] is fatal to an indexing job; every other
/// variant is recorded on the file's index record and counted.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The content store could not return the file text.
    #[error("failed to fetch file {file_id}: {message}")]
    SourceFetch { file_id: String, message: String },

    /// The file was fetched but contains no usable text.
    #[error("file is empty")]
    EmptyContent,

    /// The embedding API failed or returned a malformed response.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// A vector does not have the dimensionality of the query vector.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A vector holds `NaN` or infinite components.
    #[error("embedding contains non-finite values")]
    NonFiniteVector,

    /// The chunk or index-state store rejected a read or write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The name does not match any configured collection.
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    /// Listing the collection folder failed.
    #[error("failed to list folder {folder}: {message}")]
    Listing { folder: String, message: String },

    /// Another attempt is already indexing this file.
    #[error("file {0} is already being indexed")]
    Busy(String),
}

impl IndexError {
    /// Wrap a store failure.
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        IndexError::Persistence(err.to_string())
    }

    /// Returns `true` for errors that must abort an indexing job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IndexError::Persistence(_))
    }
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, IndexError>;
