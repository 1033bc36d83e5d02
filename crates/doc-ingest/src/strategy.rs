//! Strategy registries
//!
//! Each component is selected by a free-form name on the command line. The
//! names are resolved here into closed enums so an unknown selector is
//! rejected before any file is touched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Normalise a selector: trim, lowercase, treat `-` and `_` alike
fn normalise(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}

/// Text extraction backend used by the document parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    /// pdf-extract first, lopdf when it fails or times out
    #[default]
    Auto,
    /// pdf-extract only
    PdfExtract,
    /// lopdf page-by-page extraction
    Lopdf,
}

impl ParserKind {
    /// Registered selector names
    pub const NAMES: &'static [&'static str] = &["auto", "pdf_extract", "lopdf"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::Auto => "auto",
            ParserKind::PdfExtract => "pdf_extract",
            ParserKind::Lopdf => "lopdf",
        }
    }
}

impl FromStr for ParserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "auto" => Ok(ParserKind::Auto),
            "pdf_extract" | "pdfextract" => Ok(ParserKind::PdfExtract),
            "lopdf" | "native" => Ok(ParserKind::Lopdf),
            _ => Err(Error::unsupported_strategy("parser", s, Self::NAMES)),
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How parsed text is split into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Fixed-size character windows with overlap
    #[default]
    Fixed,
    /// Whole sentences packed up to the chunk size
    Sentence,
    /// One chunk per page
    Page,
}

impl ChunkingStrategy {
    /// Registered selector names
    pub const NAMES: &'static [&'static str] = &["fixed", "sentence", "page"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::Fixed => "fixed",
            ChunkingStrategy::Sentence => "sentence",
            ChunkingStrategy::Page => "page",
        }
    }
}

impl FromStr for ChunkingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "fixed" | "fixed_size" | "window" | "sliding_window" => Ok(ChunkingStrategy::Fixed),
            "sentence" | "sentences" => Ok(ChunkingStrategy::Sentence),
            "page" | "per_page" => Ok(ChunkingStrategy::Page),
            _ => Err(Error::unsupported_strategy("chunking", s, Self::NAMES)),
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval mode the produced chunks are intended for.
///
/// Recorded on the report and on each chunk for the downstream indexer;
/// ingestion itself does not run retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Dense vector similarity
    #[default]
    Vector,
    /// Sparse keyword scoring (BM25)
    Keyword,
    /// Vector and keyword scores fused
    Hybrid,
}

impl RetrievalStrategy {
    /// Registered selector names
    pub const NAMES: &'static [&'static str] = &["vector", "keyword", "hybrid"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalStrategy::Vector => "vector",
            RetrievalStrategy::Keyword => "keyword",
            RetrievalStrategy::Hybrid => "hybrid",
        }
    }
}

impl FromStr for RetrievalStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "vector" | "dense" | "similarity" => Ok(RetrievalStrategy::Vector),
            "keyword" | "bm25" | "sparse" => Ok(RetrievalStrategy::Keyword),
            "hybrid" => Ok(RetrievalStrategy::Hybrid),
            _ => Err(Error::unsupported_strategy("retrieval", s, Self::NAMES)),
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
