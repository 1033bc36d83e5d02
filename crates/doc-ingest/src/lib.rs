//! doc-ingest: PDF ingestion pipeline for retrieval indexing
//!
//! This crate discovers documents under an input path or glob, extracts their
//! text and tables, splits the text into source-tagged chunks, and pulls out
//! embedded images. Parser, chunking and retrieval strategies are selected by
//! name and validated before any file is read.

pub mod config;
pub mod discovery;
pub mod error;
pub mod ingestion;
pub mod strategy;
pub mod types;

pub use config::IngestConfig;
pub use discovery::{list_supported_files, FileDiscovery};
pub use error::{Error, Result};
pub use ingestion::{pipeline, Pipeline, PipelineEvent, PipelineOptions};
pub use strategy::{ChunkingStrategy, ParserKind, RetrievalStrategy};
pub use types::{
    document::{Chunk, ChunkSource, Document, FileType},
    report::{FileReport, IngestReport},
};
