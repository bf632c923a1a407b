//! Google Drive content source.
//!
//! Talks to the Drive v3 REST API with a bearer token read from the
//! environment variable named by `[source] token_env`:
//!
//! - listing: `GET /files?q='<folder>' in parents and trashed = false`,
//!   ordered by `modifiedTime desc`, paged with `pageSize`/`pageToken`;
//! - fetching: `GET /files/<id>?alt=media` with the bytes passed through
//!   [`extract::extract_text`], or
//!   `GET /files/<id>/export?mimeType=text/plain` for native Google
//!   documents, which have no downloadable bytes.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use knowledge_index_core::models::{FilePage, SourceFile};
use knowledge_index_core::source::ContentSource;

use crate::config::SourceConfig;
use crate::extract;

const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,modifiedTime)";
const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps.";
const PLAIN_TEXT: &str = "text/plain";

/// Drive v3 client implementing [`ContentSource`].
pub struct DriveSource {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    mime_type: Option<String>,
    modified_time: Option<DateTime<Utc>>,
}

impl From<DriveFile> for SourceFile {
    fn from(f: DriveFile) -> Self {
        SourceFile {
            id: f.id,
            name: f.name,
            mime_type: f.mime_type,
            modified_time: f.modified_time,
        }
    }
}

impl DriveSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.token_env))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Drive request failed: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Drive API error {}: {}", status, body);
        }
        Ok(response)
    }

    async fn mime_type_of(&self, file_id: &str) -> Result<Option<String>> {
        let url = format!("{}/files/{}", self.api_base, file_id);
        let file: DriveFile = self
            .get(&url, &[("fields", "id,mimeType")])
            .await?
            .json()
            .await
            .context("Invalid Drive file metadata")?;
        Ok(file.mime_type)
    }
}

/// Drive search expression for the live files directly inside `folder`.
fn folder_query(folder: &str) -> String {
    let escaped = folder.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}' in parents and trashed = false", escaped)
}

fn parse_file_list(json: &str) -> Result<FilePage> {
    let list: DriveFileList = serde_json::from_str(json).context("Invalid Drive file list")?;
    Ok(FilePage {
        items: list.files.into_iter().map(SourceFile::from).collect(),
        next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
    })
}

#[async_trait]
impl ContentSource for DriveSource {
    fn name(&self) -> &str {
        "drive"
    }

    async fn list_files_in_folder(
        &self,
        folder: &str,
        limit: usize,
        page_token: Option<&str>,
    ) -> Result<FilePage> {
        let url = format!("{}/files", self.api_base);
        let q = folder_query(folder);
        let page_size = limit.to_string();

        let mut query = vec![
            ("q", q.as_str()),
            ("orderBy", "modifiedTime desc"),
            ("pageSize", page_size.as_str()),
            ("fields", LIST_FIELDS),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let body = self.get(&url, &query).await?.text().await?;
        let page = parse_file_list(&body)?;
        debug!(folder, files = page.items.len(), more = page.next_page_token.is_some(), "listed drive folder");
        Ok(page)
    }

    async fn fetch_file_text(&self, file_id: &str) -> Result<String> {
        let mime = self.mime_type_of(file_id).await?;

        match mime.as_deref() {
            Some(m) if m.starts_with(GOOGLE_APPS_PREFIX) => {
                let url = format!("{}/files/{}/export", self.api_base, file_id);
                self.get(&url, &[("mimeType", "text/plain")])
                    .await?
                    .text()
                    .await
                    .with_context(|| format!("Failed to read content of {}", file_id))
            }
            _ => {
                let url = format!("{}/files/{}", self.api_base, file_id);
                let bytes = self
                    .get(&url, &[("alt", "media")])
                    .await?
                    .bytes()
                    .await
                    .with_context(|| format!("Failed to read content of {}", file_id))?;
                extract::extract_text(&bytes, mime.as_deref().unwrap_or(PLAIN_TEXT))
                    .with_context(|| format!("Failed to extract text from {}", file_id))
            }
        }
    }
}
