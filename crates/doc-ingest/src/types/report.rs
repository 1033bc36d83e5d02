//! Run report returned by the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::document::{Chunk, Document};
use super::media::{ExtractedTable, ImageDocument};
use crate::error::Result;
use crate::strategy::{ChunkingStrategy, ParserKind, RetrievalStrategy};

/// Outcome of processing one file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileReport {
    Processed {
        path: PathBuf,
        document: Document,
        chunks: Vec<Chunk>,
        tables: Vec<ExtractedTable>,
        images: Vec<ImageDocument>,
    },
    Failed {
        path: PathBuf,
        error: String,
    },
}

impl FileReport {
    pub fn path(&self) -> &Path {
        match self {
            FileReport::Processed { path, .. } | FileReport::Failed { path, .. } => path,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, FileReport::Processed { .. })
    }

    pub fn chunks(&self) -> &[Chunk] {
        match self {
            FileReport::Processed { chunks, .. } => chunks,
            FileReport::Failed { .. } => &[],
        }
    }
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Input path or pattern as given
    pub input: String,
    pub parser: ParserKind,
    pub chunking: ChunkingStrategy,
    pub retrieval: RetrievalStrategy,
    pub files: Vec<FileReport>,
}

impl IngestReport {
    pub fn new(
        input: impl Into<String>,
        parser: ParserKind,
        chunking: ChunkingStrategy,
        retrieval: RetrievalStrategy,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            input: input.into(),
            parser,
            chunking,
            retrieval,
            files: Vec::new(),
        }
    }

    pub fn files_processed(&self) -> usize {
        self.files.iter().filter(|f| f.is_processed()).count()
    }

    pub fn files_failed(&self) -> usize {
        self.files.len() - self.files_processed()
    }

    pub fn total_chunks(&self) -> usize {
        self.files.iter().map(|f| f.chunks().len()).sum()
    }

    pub fn total_tables(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f {
                FileReport::Processed { tables, .. } => tables.len(),
                FileReport::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn total_images(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f {
                FileReport::Processed { images, .. } => images.len(),
                FileReport::Failed { .. } => 0,
            })
            .sum()
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// One-line summary for status output
    pub fn summary(&self) -> String {
        format!(
            "{} file(s) processed, {} failed: {} chunks, {} tables, {} images",
            self.files_processed(),
            self.files_failed(),
            self.total_chunks(),
            self.total_tables(),
            self.total_images()
        )
    }
}
