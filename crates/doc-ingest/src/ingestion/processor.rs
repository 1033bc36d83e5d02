//! Ingestion pipeline orchestration

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::IngestConfig;
use crate::discovery::FileDiscovery;
use crate::error::{Error, Result};
use crate::strategy::{ChunkingStrategy, ParserKind, RetrievalStrategy};
use crate::types::{Chunk, Document, ExtractedTable, FileReport, ImageDocument, IngestReport};

use super::chunker::Chunker;
use super::images::ImageProcessor;
use super::parser::{DocParser, ParsedDocument};

/// Turns a file into text, and text into tables
pub trait DocumentParser {
    fn parse(&self, file_path: &Path) -> Result<ParsedDocument>;

    fn extract_tables(&self, parsed: &ParsedDocument, file_path: &Path) -> Result<Vec<ExtractedTable>>;
}

/// Splits a parsed document into chunks owned by `document`
pub trait ChunkBuilder {
    fn build_chunks(&self, document: &Document, parsed: &ParsedDocument) -> Result<Vec<Chunk>>;
}

/// Supplies the images embedded in a file
pub trait ImageSource {
    fn get_image_documents(&self, file_path: &Path) -> Result<Vec<ImageDocument>>;

    /// Persist extracted images; the default keeps them in memory only
    fn save_images(&self, _images: &mut [ImageDocument]) -> Result<()> {
        Ok(())
    }
}

impl DocumentParser for DocParser {
    fn parse(&self, file_path: &Path) -> Result<ParsedDocument> {
        self.parsing_function(file_path)
    }

    fn extract_tables(&self, parsed: &ParsedDocument, file_path: &Path) -> Result<Vec<ExtractedTable>> {
        Ok(self.extract_tables_from(parsed, file_path))
    }
}

impl ChunkBuilder for Chunker {
    fn build_chunks(&self, document: &Document, parsed: &ParsedDocument) -> Result<Vec<Chunk>> {
        Ok(self.build_document_chunks(document.id, parsed, &document.path))
    }
}

impl ImageSource for ImageProcessor {
    fn get_image_documents(&self, file_path: &Path) -> Result<Vec<ImageDocument>> {
        ImageProcessor::get_image_documents(self, file_path)
    }

    fn save_images(&self, images: &mut [ImageDocument]) -> Result<()> {
        self.save(images)
    }
}

/// Progress notifications from [`Pipeline::run_with_progress`]
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    FileStarted {
        path: PathBuf,
        /// 1-based position in the run
        index: usize,
        total: usize,
    },
    FileCompleted {
        path: PathBuf,
        chunks: usize,
        tables: usize,
        images: usize,
    },
    FileFailed {
        path: PathBuf,
        error: String,
    },
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineEvent::FileStarted { path, .. } => {
                write!(f, "processing started ... {}", path.display())
            }
            PipelineEvent::FileCompleted {
                path,
                chunks,
                tables,
                images,
            } => write!(
                f,
                "processed {}: {} chunks, {} tables, {} images",
                path.display(),
                chunks,
                tables,
                images
            ),
            PipelineEvent::FileFailed { path, error } => {
                write!(f, "failed {}: {}", path.display(), error)
            }
        }
    }
}

/// Selector names and configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub parser_name: String,
    pub chunking_strategy: String,
    pub retrieval_strategy: String,
    pub config: IngestConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            parser_name: ParserKind::default().to_string(),
            chunking_strategy: ChunkingStrategy::default().to_string(),
            retrieval_strategy: RetrievalStrategy::default().to_string(),
            config: IngestConfig::default(),
        }
    }
}

/// Main ingestion pipeline: discover, then parse, extract tables, chunk and
/// pull images for each file in turn
pub struct Pipeline {
    parser: Box<dyn DocumentParser>,
    chunker: Box<dyn ChunkBuilder>,
    images: Box<dyn ImageSource>,
    discovery: FileDiscovery,
    parser_kind: ParserKind,
    chunking: ChunkingStrategy,
    retrieval: RetrievalStrategy,
    require_files: bool,
}

impl Pipeline {
    /// Validate the selectors and build the parser, chunker and image processor
    pub fn new(options: PipelineOptions) -> Result<Self> {
        let (parser_kind, chunking, _) = resolve_selectors(&options)?;
        options.config.validate()?;

        let parser = DocParser::new(parser_kind, &options.config.parsing);
        let chunker = Chunker::new(chunking, &options.config.chunking)?;
        let images = ImageProcessor::new(&options.config.images);

        Self::with_components(options, parser, chunker, images)
    }

    /// Build a pipeline around caller-supplied components
    pub fn with_components(
        options: PipelineOptions,
        parser: impl DocumentParser + 'static,
        chunker: impl ChunkBuilder + 'static,
        images: impl ImageSource + 'static,
    ) -> Result<Self> {
        let (parser_kind, chunking, retrieval) = resolve_selectors(&options)?;

        Ok(Self {
            parser: Box::new(parser),
            chunker: Box::new(chunker),
            images: Box::new(images),
            discovery: FileDiscovery::from_config(&options.config.discovery),
            parser_kind,
            chunking,
            retrieval,
            require_files: options.config.require_files,
        })
    }

    pub fn retrieval_strategy(&self) -> RetrievalStrategy {
        self.retrieval
    }

    /// Process every supported file named by `input_path`
    pub fn run(&self, input_path: &str) -> Result<IngestReport> {
        self.run_with_progress(input_path, |_| {})
    }

    /// Like [`run`](Self::run), reporting each step to `on_event`
    pub fn run_with_progress<F>(&self, input_path: &str, mut on_event: F) -> Result<IngestReport>
    where
        F: FnMut(&PipelineEvent),
    {
        let files = self.discovery.discover(input_path);
        if files.is_empty() && self.require_files {
            return Err(Error::NoInputFiles(input_path.to_string()));
        }

        tracing::info!(
            input = input_path,
            files = files.len(),
            parser = %self.parser_kind,
            chunking = %self.chunking,
            retrieval = %self.retrieval,
            "Starting ingestion run"
        );

        let mut report = IngestReport::new(input_path, self.parser_kind, self.chunking, self.retrieval);
        let total = files.len();

        for (i, path) in files.into_iter().enumerate() {
            on_event(&PipelineEvent::FileStarted {
                path: path.clone(),
                index: i + 1,
                total,
            });
            tracing::info!("Processing {} ({}/{})", path.display(), i + 1, total);

            let file_report = match self.process_file(&path) {
                Ok(file_report) => file_report,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!("Failed to process {}: {}", path.display(), e);
                    FileReport::Failed {
                        path,
                        error: e.to_string(),
                    }
                }
            };

            on_event(&completion_event(&file_report));
            report.files.push(file_report);
        }

        report.finished_at = chrono::Utc::now();
        tracing::info!(run_id = %report.run_id, "{}", report.summary());
        Ok(report)
    }

    fn process_file(&self, path: &Path) -> Result<FileReport> {
        let parsed = self.parser.parse(path)?;
        let tables = self.parser.extract_tables(&parsed, path)?;

        let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let mut document = Document::new(
            path.to_path_buf(),
            parsed.file_type,
            parsed.content_hash.clone(),
            file_size,
        );
        document.total_pages = parsed.total_pages;

        let mut chunks = self.chunker.build_chunks(&document, &parsed)?;
        for chunk in &mut chunks {
            chunk.metadata.insert(
                "retrieval_strategy".to_string(),
                serde_json::Value::from(self.retrieval.as_str()),
            );
        }
        document.total_chunks = chunks.len() as u32;

        let mut images = self.images.get_image_documents(path)?;
        self.images.save_images(&mut images)?;

        tracing::debug!(
            file = %path.display(),
            chunks = chunks.len(),
            tables = tables.len(),
            images = images.len(),
            "File complete"
        );

        Ok(FileReport::Processed {
            path: path.to_path_buf(),
            document,
            chunks,
            tables,
            images,
        })
    }
}

/// Run the pipeline over `input_path` with default configuration
pub fn pipeline(
    input_path: &str,
    parser_name: &str,
    chunking_strategy: &str,
    retrieval_strategy: &str,
) -> Result<IngestReport> {
    let pipeline = Pipeline::new(PipelineOptions {
        parser_name: parser_name.to_string(),
        chunking_strategy: chunking_strategy.to_string(),
        retrieval_strategy: retrieval_strategy.to_string(),
        config: IngestConfig::default(),
    })?;
    pipeline.run(input_path)
}

fn resolve_selectors(options: &PipelineOptions) -> Result<(ParserKind, ChunkingStrategy, RetrievalStrategy)> {
    Ok((
        options.parser_name.parse()?,
        options.chunking_strategy.parse()?,
        options.retrieval_strategy.parse()?,
    ))
}

fn completion_event(file_report: &FileReport) -> PipelineEvent {
    match file_report {
        FileReport::Processed {
            path,
            chunks,
            tables,
            images,
            ..
        } => PipelineEvent::FileCompleted {
            path: path.clone(),
            chunks: chunks.len(),
            tables: tables.len(),
            images: images.len(),
        },
        FileReport::Failed { path, error } => PipelineEvent::FileFailed {
            path: path.clone(),
            error: error.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkSource, FileType};
    use std::cell::RefCell;
    use std::rc::Rc;

    type CallLog = Rc<RefCell<Vec<String>>>;

    fn name_of(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    struct MockParser {
        log: CallLog,
        fail_on: Option<&'static str>,
    }

    impl DocumentParser for MockParser {
        fn parse(&self, file_path: &Path) -> Result<ParsedDocument> {
            let name = name_of(file_path);
            self.log.borrow_mut().push(format!("parse {}", name));
            if self.fail_on == Some(name.as_str()) {
                return Err(Error::file_parse(name, "corrupt"));
            }
            Ok(ParsedDocument::from_pages(
                FileType::Pdf,
                vec![(1, format!("text of {}", name))],
                Some(1),
                true,
            ))
        }

        fn extract_tables(&self, _parsed: &ParsedDocument, file_path: &Path) -> Result<Vec<ExtractedTable>> {
            self.log.borrow_mut().push(format!("tables {}", name_of(file_path)));
            Ok(Vec::new())
        }
    }

    struct MockChunker {
        log: CallLog,
    }

    impl ChunkBuilder for MockChunker {
        fn build_chunks(&self, document: &Document, parsed: &ParsedDocument) -> Result<Vec<Chunk>> {
            self.log.borrow_mut().push(format!("chunks {}", name_of(&document.path)));
            let source = ChunkSource::new(&document.path, ChunkingStrategy::Fixed);
            Ok(vec![Chunk::new(
                document.id,
                parsed.content.clone(),
                source,
                0,
                parsed.content.len(),
                0,
            )])
        }
    }

    struct MockImages {
        log: CallLog,
    }

    impl ImageSource for MockImages {
        fn get_image_documents(&self, file_path: &Path) -> Result<Vec<ImageDocument>> {
            self.log.borrow_mut().push(format!("images {}", name_of(file_path)));
            Ok(Vec::new())
        }
    }

    fn mock_pipeline(options: PipelineOptions, fail_on: Option<&'static str>) -> (Pipeline, CallLog) {
        let log = CallLog::default();
        let pipeline = Pipeline::with_components(
            options,
            MockParser {
                log: log.clone(),
                fail_on,
            },
            MockChunker { log: log.clone() },
            MockImages { log: log.clone() },
        )
        .unwrap();
        (pipeline, log)
    }

    fn docs_dir(names: &[&str]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(tmp.path().join(name), b"%PDF-1.4").unwrap();
        }
        tmp
    }

    fn all_files(dir: &tempfile::TempDir) -> String {
        format!("{}/*", dir.path().display())
    }

    #[test]
    fn test_single_file_steps_run_once_in_order() {
        let tmp = docs_dir(&["a.pdf"]);
        let (pipeline, log) = mock_pipeline(PipelineOptions::default(), None);

        let report = pipeline.run(tmp.path().join("a.pdf").to_str().unwrap()).unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["parse a.pdf", "tables a.pdf", "chunks a.pdf", "images a.pdf"]
        );
        assert_eq!(report.files_processed(), 1);
    }

    #[test]
    fn test_glob_processes_only_pdfs_and_reports_progress() {
        let tmp = docs_dir(&["a.pdf", "b.txt", "c.pdf"]);
        let (pipeline, log) = mock_pipeline(PipelineOptions::default(), None);

        let mut events = Vec::new();
        let pattern = format!("{}/*.pdf", tmp.path().display());
        let report = pipeline
            .run_with_progress(&pattern, |e| events.push(e.clone()))
            .unwrap();

        let started: Vec<String> = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::FileStarted { .. }))
            .map(|e| e.to_string())
            .collect();
        assert_eq!(
            started,
            vec![
                format!("processing started ... {}", tmp.path().join("a.pdf").display()),
                format!("processing started ... {}", tmp.path().join("c.pdf").display()),
            ]
        );
        assert_eq!(log.borrow().iter().filter(|l| l.starts_with("parse")).count(), 2);
        assert_eq!(report.files.len(), 2);
    }

    #[test]
    fn test_chunks_record_source_and_retrieval_strategy() {
        let tmp = docs_dir(&["a.pdf"]);
        let options = PipelineOptions {
            retrieval_strategy: "bm25".to_string(),
            ..PipelineOptions::default()
        };
        let (pipeline, _) = mock_pipeline(options, None);
        let path = tmp.path().join("a.pdf");

        let report = pipeline.run(path.to_str().unwrap()).unwrap();

        assert_eq!(report.retrieval, RetrievalStrategy::Keyword);
        let chunks = report.files[0].chunks();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source.path, path);
        assert_eq!(chunks[0].metadata["retrieval_strategy"], "keyword");
    }

    #[test]
    fn test_failed_file_does_not_stop_the_run() {
        let tmp = docs_dir(&["a.pdf", "b.pdf", "c.pdf"]);
        let (pipeline, log) = mock_pipeline(PipelineOptions::default(), Some("b.pdf"));

        let mut failures = Vec::new();
        let report = pipeline
            .run_with_progress(&all_files(&tmp), |e| {
                if let PipelineEvent::FileFailed { path, .. } = e {
                    failures.push(name_of(path));
                }
            })
            .unwrap();

        assert_eq!(failures, vec!["b.pdf"]);
        assert_eq!(report.files_processed(), 2);
        assert_eq!(report.files_failed(), 1);
        assert!(!log.borrow().contains(&"tables b.pdf".to_string()));
        assert!(log.borrow().contains(&"images c.pdf".to_string()));
    }

    #[test]
    fn test_fatal_error_aborts_the_run() {
        struct BadConfigChunker;
        impl ChunkBuilder for BadConfigChunker {
            fn build_chunks(&self, _: &Document, _: &ParsedDocument) -> Result<Vec<Chunk>> {
                Err(Error::config("chunk_size must be greater than 0"))
            }
        }

        let tmp = docs_dir(&["a.pdf", "b.pdf"]);
        let log = CallLog::default();
        let pipeline = Pipeline::with_components(
            PipelineOptions::default(),
            MockParser {
                log: log.clone(),
                fail_on: None,
            },
            BadConfigChunker,
            MockImages { log: log.clone() },
        )
        .unwrap();

        let err = pipeline.run(&all_files(&tmp)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!log.borrow().contains(&"parse b.pdf".to_string()));
    }

    #[test]
    fn test_empty_input_is_not_an_error_by_default() {
        let tmp = docs_dir(&["notes.txt"]);
        let (pipeline, log) = mock_pipeline(PipelineOptions::default(), None);

        let report = pipeline.run(&all_files(&tmp)).unwrap();
        assert!(report.files.is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_require_files_rejects_empty_input() {
        let tmp = docs_dir(&[]);
        let mut options = PipelineOptions::default();
        options.config.require_files = true;
        let (pipeline, _) = mock_pipeline(options, None);

        let err = pipeline.run(&all_files(&tmp)).unwrap_err();
        assert!(matches!(err, Error::NoInputFiles(_)));
    }

    #[test]
    fn test_unknown_selectors_fail_at_construction() {
        for (parser, chunking, retrieval) in [
            ("docling", "fixed", "vector"),
            ("auto", "semantic", "vector"),
            ("auto", "fixed", "graph"),
        ] {
            let result = Pipeline::new(PipelineOptions {
                parser_name: parser.to_string(),
                chunking_strategy: chunking.to_string(),
                retrieval_strategy: retrieval.to_string(),
                config: IngestConfig::default(),
            });
            assert!(matches!(result, Err(Error::UnsupportedStrategy { .. })));
        }
    }

    #[test]
    fn test_invalid_chunking_config_fails_at_construction() {
        let mut options = PipelineOptions::default();
        options.config.chunking.chunk_overlap = options.config.chunking.chunk_size;
        assert!(matches!(Pipeline::new(options), Err(Error::Config(_))));
    }
}
