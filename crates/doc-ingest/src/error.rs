//! Error types for the ingestion pipeline

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ingestion pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A strategy selector did not name a registered variant
    #[error("Unsupported {kind} strategy '{name}' (expected one of: {expected})")]
    UnsupportedStrategy {
        kind: &'static str,
        name: String,
        expected: String,
    },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Input resolved to zero supported files
    #[error("No supported files found for input '{0}'")]
    NoInputFiles(String),

    /// Image extraction error
    #[error("Image extraction failed: {0}")]
    Image(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config error
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an unsupported strategy error listing the accepted names
    pub fn unsupported_strategy(kind: &'static str, name: impl Into<String>, expected: &[&str]) -> Self {
        Self::UnsupportedStrategy {
            kind,
            name: name.into(),
            expected: expected.join(", "),
        }
    }

    /// Create an image extraction error
    pub fn image(message: impl Into<String>) -> Self {
        Self::Image(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Errors that invalidate the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::UnsupportedStrategy { .. } | Error::NoInputFiles(_) | Error::Toml(_)
        )
    }
}
