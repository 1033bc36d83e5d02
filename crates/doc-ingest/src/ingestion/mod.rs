//! Document ingestion: parsing, table detection, chunking and image
//! extraction, tied together by the pipeline

mod chunker;
mod images;
mod parser;
mod processor;
mod tables;

pub use chunker::Chunker;
pub use images::{save_images, ImageProcessor};
pub use parser::{DocParser, PageContent, ParsedDocument};
pub use processor::{
    pipeline, ChunkBuilder, DocumentParser, ImageSource, Pipeline, PipelineEvent, PipelineOptions,
};
pub use tables::TableDetector;
