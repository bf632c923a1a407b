//! # Knowledge Index
//!
//! Collection-scoped document indexing and similarity retrieval.
//!
//! Files from an external content store (Google Drive or a local
//! directory) are chunked, embedded, and stored per collection in SQLite.
//! Queries embed the question and rank the stored chunks of one
//! collection by cosine similarity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────┐
//! │   Source    │──▶│ Walker → FileIndexer │──▶│  SQLite  │
//! │ Drive / FS  │   │  chunk → embed       │   │ chunks + │
//! └─────────────┘   └──────────────────────┘   │  state   │
//!                                              └────┬─────┘
//!                                                   ▼
//!                                            ┌────────────┐
//!                                            │ QueryEngine│
//!                                            └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kidx init                                   # create database
//! kidx index                                  # index every collection
//! kidx query "pricing tiers" --collection launch_packs
//! kidx status --collection launch_packs
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite chunk and index-state store |
//! | [`embedding`] | Embedding providers and rate limiting |
//! | [`connector_drive`] | Google Drive source |
//! | [`connector_fs`] | Local directory source |
//! | [`extract`] | Text extraction from fetched bytes |
//! | [`ingest`] | Collection walker and indexing job |
//! | [`index_cmd`] | `kidx index` and `kidx index-file` |
//! | [`services`] | Wiring from configuration |
//! | [`search`] | `kidx query` |
//! | [`status`] | `kidx status` |
//! | [`collections`] | `kidx collections` |

pub mod collections;
pub mod config;
pub mod connector_drive;
pub mod connector_fs;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod index_cmd;
pub mod ingest;
pub mod migrate;
pub mod search;
pub mod services;
pub mod sqlite_store;
pub mod status;
