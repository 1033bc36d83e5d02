//! Configuration for the ingestion pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming a default config file
pub const CONFIG_ENV_VAR: &str = "DOC_INGEST_CONFIG";

/// Main ingestion configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// File discovery configuration
    pub discovery: DiscoveryConfig,
    /// Parser configuration
    pub parsing: ParsingConfig,
    /// Text chunking configuration
    pub chunking: ChunkingConfig,
    /// Image extraction configuration
    pub images: ImageConfig,
    /// Fail the run when the input resolves to no files
    pub require_files: bool,
}

impl IngestConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let config: IngestConfig = toml::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Load from an explicit path, else from `DOC_INGEST_CONFIG`, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(env_path) if !env_path.is_empty() => Self::from_file(PathBuf::from(env_path)),
            _ => Ok(Self::default()),
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.discovery.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(Error::config("discovery.extensions must name at least one extension"));
        }
        if self.parsing.timeout_secs == 0 {
            return Err(Error::config("parsing.timeout_secs must be greater than 0"));
        }
        if self.parsing.min_table_rows < 2 || self.parsing.min_table_columns < 2 {
            return Err(Error::config("table detection needs at least 2 rows and 2 columns"));
        }
        Ok(())
    }
}

/// File discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Supported extensions, with or without the leading dot
    pub extensions: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["pdf".to_string()],
        }
    }
}

/// Parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Upper bound on pdf-extract for a single file, in seconds
    pub timeout_secs: u64,
    /// Minimum consecutive rows for a table
    pub min_table_rows: usize,
    /// Minimum cells per row for a table
    pub min_table_columns: usize,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            min_table_rows: 2,
            min_table_columns: 2,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in UTF-8 bytes
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in UTF-8 bytes
    pub chunk_overlap: usize,
    /// Chunks shorter than this many bytes are dropped
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
            min_chunk_size: 50,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Image extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Extract images at all
    pub enabled: bool,
    /// Skip images whose encoded stream is smaller than this
    pub min_bytes: usize,
    /// Write extracted images here when set
    pub output_dir: Option<PathBuf>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_bytes: 0,
            output_dir: None,
        }
    }
}
