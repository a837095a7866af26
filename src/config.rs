//! Configuration module for the embedding store.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `EMBED_` and use double
//! underscores to separate nested levels:
//! - `EMBED_INGEST__BATCH_SIZE=50` sets `ingest.batch_size`
//! - `EMBED_PROVIDER__MODEL=text-embedding-3-small` sets `provider.model`
//! - `EMBED_TABLES__VECTORS=docs` sets `tables.vectors`
//!
//! The API token is also read from `OPENAI_API_KEY` by the CLI.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::embedding::{DEFAULT_API_BASE, DEFAULT_BATCH_SIZE, DEFAULT_MODEL, MAX_BATCH_SIZE};
use crate::error::{EmbedError, EmbedResult};
use crate::similarity::DEFAULT_RESULT_COUNT;

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".embed-to-sqlite";

/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Embedding provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Ingestion settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Similarity query settings
    #[serde(default)]
    pub similarity: SimilarityConfig,

    /// Table names
    #[serde(default)]
    pub tables: TablesConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Embedding model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token; prefer OPENAI_API_KEY over storing it here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for rate-limited or failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestConfig {
    /// Records per provider request (1-2048)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Abort on the first failed batch instead of skipping it
    #[serde(default = "default_false")]
    pub strict: bool,

    /// Skip records whose id is already stored
    #[serde(default = "default_false")]
    pub skip_existing: bool,

    /// Separator placed between text columns
    #[serde(default = "default_text_separator")]
    pub text_separator: String,

    /// Show a progress bar on terminals
    #[serde(default = "default_true")]
    pub progress: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimilarityConfig {
    /// Results per query
    #[serde(default = "default_count")]
    pub count: usize,

    /// Keep a seed in its own neighbor list
    #[serde(default = "default_false")]
    pub include_self: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TablesConfig {
    /// Table holding `(id, embedding)` rows
    #[serde(default = "default_vectors_table")]
    pub vectors: String,

    /// Table holding `(source_id, target_id, score)` rows
    #[serde(default = "default_similarities_table")]
    pub similarities: String,
}

fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_text_separator() -> String {
    " ".to_string()
}
fn default_count() -> usize {
    DEFAULT_RESULT_COUNT
}
fn default_vectors_table() -> String {
    "embeddings".to_string()
}
fn default_similarities_table() -> String {
    "similarities".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: false,
            provider: ProviderConfig::default(),
            ingest: IngestConfig::default(),
            similarity: SimilarityConfig::default(),
            tables: TablesConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            token: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            strict: false,
            skip_existing: false,
            text_separator: default_text_separator(),
            progress: true,
        }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            include_self: false,
        }
    }
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            vectors: default_vectors_table(),
            similarities: default_similarities_table(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels
            .merge(Env::prefixed("EMBED_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for the config directory
    /// from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE));
            }
        }

        None
    }

    /// Checks values the type system cannot.
    pub fn validate(&self) -> EmbedResult<()> {
        if self.ingest.batch_size == 0 || self.ingest.batch_size > MAX_BATCH_SIZE {
            return Err(EmbedError::config(format!(
                "ingest.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.ingest.batch_size
            )));
        }
        if self.similarity.count == 0 {
            return Err(EmbedError::config("similarity.count must be at least 1"));
        }
        if self.tables.vectors.is_empty() || self.tables.similarities.is_empty() {
            return Err(EmbedError::config("table names must not be empty"));
        }
        if self.tables.vectors.eq_ignore_ascii_case(&self.tables.similarities) {
            return Err(EmbedError::config(format!(
                "tables.vectors and tables.similarities must differ, both are '{}'",
                self.tables.vectors
            )));
        }
        Ok(())
    }

    /// Copy with the API token masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.provider.token.is_some() {
            copy.provider.token = Some("********".to_string());
        }
        copy
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        Self::init_config_file_at(Path::new("."), force)
    }

    /// Create the settings template below `root`
    pub fn init_config_file_at(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = format!(
            r#"# embed-to-sqlite configuration

# Version of the configuration schema
version = 1

# Verbose logging
debug = false

[provider]
# OpenAI-compatible API base URL
api_base = "{DEFAULT_API_BASE}"

# Embedding model
model = "{DEFAULT_MODEL}"

# API token. Prefer the OPENAI_API_KEY environment variable.
# token = "sk-..."

# Request timeout in seconds
timeout_secs = 60

# Retries for 429 and 5xx responses, with exponential backoff
max_retries = 3

[ingest]
# Records per embedding request (1-{MAX_BATCH_SIZE})
batch_size = {DEFAULT_BATCH_SIZE}

# Abort on the first failed batch instead of skipping it
strict = false

# Skip records whose id is already stored
skip_existing = false

# Separator placed between text columns
text_separator = " "

# Show a progress bar when stderr is a terminal
progress = true

[similarity]
# Results per query
count = {DEFAULT_RESULT_COUNT}

# Keep a seed id in its own neighbor list
include_self = false

[tables]
# Table holding (id, embedding) rows
vectors = "embeddings"

# Table holding (source_id, target_id, score) rows
similarities = "similarities"
"#
        );

        std::fs::write(&config_path, template)?;
        Ok(config_path)
    }
}
