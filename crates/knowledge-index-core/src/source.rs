//! External content store seam.
//!
//! A [`ContentSource`] exposes the two operations the indexer needs from a
//! remote document store: list the files in a folder, and fetch one file's
//! text. The indexer never creates, mutates, or deletes source files.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::FilePage;

/// MIME types indexed when configuration does not override the list.
pub const DEFAULT_INDEXABLE_MIME_TYPES: &[&str] = &[
    "text/plain",
    "text/csv",
    "application/vnd.google-apps.document",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short identifier used in logs (e.g. `"drive"`, `"filesystem"`).
    fn name(&self) -> &str;

    /// List up to `limit` files in `folder`, starting at `page_token`.
    async fn list_files_in_folder(
        &self,
        folder: &str,
        limit: usize,
        page_token: Option<&str>,
    ) -> Result<FilePage>;

    /// Return the full text of a file. Fails without partial content.
    async fn fetch_file_text(&self, file_id: &str) -> Result<String>;
}
