//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::strategy::ChunkingStrategy;

/// File types the parser knows about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Whether the format can carry embedded images
    pub fn has_images(&self) -> bool {
        matches!(self, Self::Pdf)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Path the document was read from
    pub path: PathBuf,
    /// File type
    pub file_type: FileType,
    /// Content hash for deduplication
    pub content_hash: String,
    /// Total number of pages (if applicable)
    pub total_pages: Option<u32>,
    /// Total number of chunks created
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    pub fn new(path: PathBuf, file_type: FileType, content_hash: String, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            file_type,
            content_hash,
            total_pages: None,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Source information for a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Originating file path
    pub path: PathBuf,
    /// Page number (1-indexed) when the chunk lies within one page
    pub page_number: Option<u32>,
    /// Total pages in document
    pub page_count: Option<u32>,
    /// Strategy that produced the chunk
    pub strategy: ChunkingStrategy,
}

impl ChunkSource {
    pub fn new(path: impl Into<PathBuf>, strategy: ChunkingStrategy) -> Self {
        Self {
            path: path.into(),
            page_number: None,
            page_count: None,
            strategy,
        }
    }

    /// Format source for display
    pub fn format_citation(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());

        match (self.page_number, self.page_count) {
            (Some(page), Some(count)) => format!("{}, Page {} of {}", name, page, count),
            (Some(page), None) => format!("{}, Page {}", name, page),
            _ => name,
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Source information
    pub source: ChunkSource,
    /// Byte offset where the chunk starts in the parsed document content
    pub byte_start: usize,
    /// Byte offset one past the chunk's last byte
    pub byte_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
    /// Rough token count (words / 0.75)
    pub token_estimate: usize,
    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Chunk {
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        byte_start: usize,
        byte_end: usize,
        chunk_index: u32,
    ) -> Self {
        let token_estimate = estimate_tokens(&content);
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            source,
            byte_start,
            byte_end,
            chunk_index,
            token_estimate,
            metadata: HashMap::new(),
        }
    }
}

/// Rough token estimation: words / 0.75
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    ((words as f32) / 0.75).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(FileType::from_path(Path::new("docs/a.PDF")), FileType::Pdf);
        assert_eq!(FileType::from_path(Path::new("notes.md")), FileType::Markdown);
        assert_eq!(FileType::from_path(Path::new("archive.tar")), FileType::Unknown);
        assert_eq!(FileType::from_path(Path::new("README")), FileType::Unknown);
    }

    #[test]
    fn test_format_citation() {
        let mut source = ChunkSource::new("/data/docs/report.pdf", ChunkingStrategy::Page);
        assert_eq!(source.format_citation(), "report.pdf");
        source.page_number = Some(3);
        source.page_count = Some(10);
        assert_eq!(source.format_citation(), "report.pdf, Page 3 of 10");
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("one two three"), 4);
    }
}
