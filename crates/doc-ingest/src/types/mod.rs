//! Core types for the ingestion pipeline

pub mod document;
pub mod media;
pub mod report;

pub use document::{estimate_tokens, Chunk, ChunkSource, Document, FileType};
pub use media::{ExtractedTable, ImageDocument, ImageFormat};
pub use report::{FileReport, IngestReport};
