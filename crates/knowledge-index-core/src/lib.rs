//! # Knowledge Index Core
//!
//! Shared, runtime-agnostic logic for Knowledge Index: data models,
//! chunking, the embedding and storage seams, the per-file indexer, and
//! the similarity query engine.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. Concrete
//! stores, embedding providers, and content sources live in the
//! `knowledge-index` app crate and are injected through the traits
//! defined here.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod models;
pub mod query;
pub mod source;
pub mod store;

pub use error::IndexError;
