//! Local filesystem content source.
//!
//! Collection folders are directories under `[source] root`. A file's id is
//! its path relative to the root, so it can be fetched again without a
//! listing. Listings cover the direct children of the folder, newest first,
//! and use the numeric offset of the next page as the page token.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use knowledge_index_core::models::{FilePage, SourceFile};
use knowledge_index_core::source::ContentSource;

use crate::extract::{self, MIME_DOCX};

pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a root-relative path, refusing anything that escapes the root.
    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            bail!("path escapes source root: {}", relative);
        }
        Ok(self.root.join(rel))
    }

    fn scan(&self, folder: &str) -> Result<Vec<SourceFile>> {
        let dir = self.resolve(folder)?;
        if !dir.is_dir() {
            bail!("folder does not exist: {}", dir.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from);

            files.push(SourceFile {
                id: relative.to_string_lossy().replace('\\', "/"),
                name: entry.file_name().to_string_lossy().to_string(),
                mime_type: Some(mime_from_path(path).to_string()),
                modified_time: modified,
            });
        }

        files.sort_by(|a, b| b.modified_time.cmp(&a.modified_time).then(a.id.cmp(&b.id)));
        Ok(files)
    }
}

/// MIME type guessed from the file extension.
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "md" | "markdown" | "text" => "text/plain",
        "csv" => "text/csv",
        "docx" => MIME_DOCX,
        "pdf" => "application/pdf",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ContentSource for FsSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn list_files_in_folder(
        &self,
        folder: &str,
        limit: usize,
        page_token: Option<&str>,
    ) -> Result<FilePage> {
        let offset: usize = match page_token {
            Some(t) => t
                .parse()
                .with_context(|| format!("invalid page token: {}", t))?,
            None => 0,
        };

        let files = self.scan(folder)?;
        let end = offset.saturating_add(limit.max(1)).min(files.len());
        let items = files.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_page_token = (end < files.len()).then(|| end.to_string());

        Ok(FilePage {
            items,
            next_page_token,
        })
    }

    async fn fetch_file_text(&self, file_id: &str) -> Result<String> {
        let path = self.resolve(file_id)?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        extract::extract_text(&bytes, mime_from_path(&path))
            .with_context(|| format!("Failed to extract text from {}", path.display()))
    }
}
