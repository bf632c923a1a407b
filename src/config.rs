//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/kidx.sqlite"
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [source]
//! provider = "drive"
//!
//! [[collections]]
//! name = "launch_packs"
//! folder_env = "DRIVE_LAUNCH_PACKS_FOLDER"
//! label = "Launch Packs"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use knowledge_index_core::chunk::{Chunker, DEFAULT_OVERLAP_TOKENS, DEFAULT_TARGET_TOKENS};
use knowledge_index_core::embedding::DEFAULT_BATCH_SIZE;
use knowledge_index_core::models::Collection;
use knowledge_index_core::query::DEFAULT_TOP_K;
use knowledge_index_core::source::DEFAULT_INDEXABLE_MIME_TYPES;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_target_tokens")]
    pub target_tokens: usize,
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_tokens: DEFAULT_TARGET_TOKENS,
            overlap_tokens: DEFAULT_OVERLAP_TOKENS,
        }
    }
}

impl ChunkingConfig {
    pub fn chunker(&self) -> Chunker {
        Chunker::new(self.target_tokens, self.overlap_tokens)
    }
}

fn default_target_tokens() -> usize {
    DEFAULT_TARGET_TOKENS
}
fn default_overlap_tokens() -> usize {
    DEFAULT_OVERLAP_TOKENS
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Ollama base URL.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Token-bucket limit on provider calls. Unlimited when absent.
    #[serde(default)]
    pub requests_per_minute: Option<u32>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            requests_per_minute: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Files requested per listing call.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Pause between files, in milliseconds.
    #[serde(default = "default_file_delay_ms")]
    pub file_delay_ms: u64,
    #[serde(default = "default_indexable_mime_types")]
    pub indexable_mime_types: Vec<String>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            file_delay_ms: default_file_delay_ms(),
            indexable_mime_types: default_indexable_mime_types(),
        }
    }
}

fn default_page_size() -> usize {
    1000
}
fn default_file_delay_ms() -> u64 {
    100
}
fn default_indexable_mime_types() -> Vec<String> {
    DEFAULT_INDEXABLE_MIME_TYPES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// `"drive"` or `"filesystem"`.
    #[serde(default = "default_source_provider")]
    pub provider: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Environment variable holding the Drive bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Root directory for the filesystem source. Collection folders are
    /// resolved relative to it.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            provider: default_source_provider(),
            api_base: default_api_base(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            root: None,
        }
    }
}

fn default_source_provider() -> String {
    "drive".to_string()
}
fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}
fn default_token_env() -> String {
    "GDRIVE_ACCESS_TOKEN".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectionConfig {
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    /// Environment variable consulted when `folder` is empty.
    #[serde(default)]
    pub folder_env: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CollectionConfig {
    /// Resolve the folder reference from config, then from `folder_env`.
    pub fn resolve(&self) -> Collection {
        let folder = self
            .folder
            .clone()
            .filter(|f| !f.trim().is_empty())
            .or_else(|| {
                self.folder_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
            });
        let label = self.label.clone().unwrap_or_else(|| self.name.clone());
        Collection::new(&self.name, folder, label)
    }
}

impl Config {
    /// Every configured collection with its folder resolved.
    pub fn resolved_collections(&self) -> Vec<Collection> {
        self.collections.iter().map(|c| c.resolve()).collect()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.chunking.target_tokens == 0 {
        bail!("chunking.target_tokens must be > 0");
    }
    if config.chunking.overlap_tokens >= config.chunking.target_tokens {
        bail!("chunking.overlap_tokens must be < chunking.target_tokens");
    }

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    if config.indexing.page_size == 0 {
        bail!("indexing.page_size must be > 0");
    }

    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    if config.embedding.requests_per_minute == Some(0) {
        bail!("embedding.requests_per_minute must be > 0 when set");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    match config.source.provider.as_str() {
        "drive" => {}
        "filesystem" => {
            if config.source.root.is_none() {
                bail!("source.root is required when provider is 'filesystem'");
            }
        }
        other => bail!(
            "Unknown source provider: '{}'. Must be drive or filesystem.",
            other
        ),
    }

    let mut seen = HashSet::new();
    for c in &config.collections {
        if c.name.trim().is_empty() {
            bail!("collection name must not be empty");
        }
        if !seen.insert(c.name.as_str()) {
            bail!("duplicate collection name: '{}'", c.name);
        }
    }

    Ok(config)
}
