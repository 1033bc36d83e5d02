//! Document parser with selectable PDF text backends

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::tables::TableDetector;
use crate::config::ParsingConfig;
use crate::error::{Error, Result};
use crate::strategy::ParserKind;
use crate::types::{ExtractedTable, FileType};

/// Glyph names some PDF fonts leak into extracted text
const GLYPH_NAMES: &[(&str, &str)] = &[
    ("uni2010", "-"),
    ("uni2011", "-"),
    ("uni2013", "-"),
    ("uni2014", "--"),
    ("uni2018", "'"),
    ("uni2019", "'"),
    ("uni201C", "\""),
    ("uni201D", "\""),
    ("uni2022", "* "),
    ("uni2026", "..."),
    ("uni00A0", " "),
    ("uni2212", "-"),
    ("f_f_i", "ffi"),
    ("f_f_l", "ffl"),
    ("f_i", "fi"),
    ("f_l", "fl"),
    ("f_f", "ff"),
];

/// Typographic characters mapped to ASCII
const CHAR_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Clean up extracted PDF text: glyph names, ligatures, NULs, blank lines
fn cleanup_pdf_text(text: &str) -> String {
    let mut result = text.replace('\0', "");

    for (glyph, replacement) in GLYPH_NAMES {
        for pattern in [format!("({})", glyph), format!("<{}>", glyph)] {
            if result.contains(&pattern) {
                result = result.replace(&pattern, replacement);
            }
        }
    }

    let mut cleaned = String::with_capacity(result.len());
    for ch in result.chars() {
        match CHAR_REPLACEMENTS.iter().find(|(c, _)| *c == ch) {
            Some((_, replacement)) => cleaned.push_str(replacement),
            None => cleaned.push(ch),
        }
    }

    cleaned
        .lines()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parsed document with extracted text and metadata
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text content, pages joined by `\n`
    pub content: String,
    /// Content hash for deduplication
    pub content_hash: String,
    /// Total pages (if applicable)
    pub total_pages: Option<u32>,
    /// Page-level content
    pub pages: Vec<PageContent>,
    /// Whether `pages` reflect real page boundaries
    pub paginated: bool,
    /// Backend that produced the text, plus document info entries
    pub metadata: HashMap<String, String>,
}

impl ParsedDocument {
    /// Assemble a document from per-page text, computing offsets into `content`
    pub(crate) fn from_pages(
        file_type: FileType,
        pages: Vec<(u32, String)>,
        total_pages: Option<u32>,
        paginated: bool,
    ) -> Self {
        let mut content = String::new();
        let mut page_contents = Vec::with_capacity(pages.len());

        for (page_number, text) in pages {
            if text.trim().is_empty() {
                continue;
            }
            if !content.is_empty() {
                content.push('\n');
            }
            page_contents.push(PageContent {
                page_number,
                byte_offset: content.len(),
                content: text.clone(),
            });
            content.push_str(&text);
        }

        Self {
            file_type,
            content_hash: hash_content(&content),
            content,
            total_pages,
            pages: page_contents,
            paginated,
            metadata: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Content from a single page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
    /// Byte offset of this page in the document content
    pub byte_offset: usize,
}

/// Document parser bound to one text extraction backend
#[derive(Debug, Clone)]
pub struct DocParser {
    kind: ParserKind,
    timeout: Duration,
    tables: TableDetector,
}

impl DocParser {
    /// Create a parser for the given backend
    pub fn new(kind: ParserKind, config: &ParsingConfig) -> Self {
        Self {
            kind,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            tables: TableDetector::from_config(config),
        }
    }

    /// Create a parser from a selector name, rejecting unknown backends
    pub fn from_name(parser_name: &str, config: &ParsingConfig) -> Result<Self> {
        Ok(Self::new(parser_name.parse()?, config))
    }

    pub fn kind(&self) -> ParserKind {
        self.kind
    }

    /// Read and parse a file into text content
    pub fn parsing_function(&self, file_path: &Path) -> Result<ParsedDocument> {
        let data = std::fs::read(file_path)
            .map_err(|e| Error::file_parse(file_path.display().to_string(), format!("cannot read file: {}", e)))?;
        let filename = file_path.display().to_string();
        self.parse_bytes(&filename, FileType::from_path(file_path), &data)
    }

    /// Parse in-memory file contents
    pub fn parse_bytes(&self, filename: &str, file_type: FileType, data: &[u8]) -> Result<ParsedDocument> {
        let mut parsed = match file_type {
            FileType::Pdf => self.parse_pdf(filename, data)?,
            FileType::Txt | FileType::Markdown => Self::parse_text(data, file_type),
            FileType::Unknown => {
                return Err(Error::UnsupportedFileType(filename.to_string()));
            }
        };

        if parsed.is_empty() {
            return Err(Error::file_parse(filename, "No text content could be extracted"));
        }

        parsed.metadata.insert("parser".to_string(), self.kind.to_string());
        tracing::debug!(
            file = filename,
            pages = parsed.pages.len(),
            bytes = parsed.content.len(),
            "Parsed document"
        );
        Ok(parsed)
    }

    /// Parse a file and extract the tables found in its text
    pub fn extract_tables(&self, file_path: &Path) -> Result<Vec<ExtractedTable>> {
        let parsed = self.parsing_function(file_path)?;
        Ok(self.extract_tables_from(&parsed, file_path))
    }

    /// Extract tables from an already parsed document
    pub fn extract_tables_from(&self, parsed: &ParsedDocument, source: &Path) -> Vec<ExtractedTable> {
        self.tables.detect_in_document(parsed, source)
    }

    fn parse_pdf(&self, filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        if !data.starts_with(b"%PDF") && !data.windows(5).take(1024).any(|w| w == b"%PDF-") {
            return Err(Error::file_parse(filename, "missing %PDF header"));
        }

        match self.kind {
            ParserKind::Lopdf => Self::parse_pdf_lopdf(filename, data),
            ParserKind::PdfExtract => self.parse_pdf_extract(filename, data),
            ParserKind::Auto => match self.parse_pdf_extract(filename, data) {
                Ok(parsed) if !parsed.is_empty() => Ok(parsed),
                Ok(_) => {
                    tracing::warn!(file = filename, "pdf-extract produced no text, trying lopdf");
                    Self::parse_pdf_lopdf(filename, data)
                }
                Err(e) => {
                    tracing::warn!(file = filename, "pdf-extract failed: {}, trying lopdf", e);
                    Self::parse_pdf_lopdf(filename, data)
                }
            },
        }
    }

    /// Whole-document extraction via pdf-extract, bounded by the timeout
    fn parse_pdf_extract(&self, filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let raw = extract_pdf_with_timeout(filename, data, self.timeout)?;

        let total_pages = lopdf::Document::load_mem(data)
            .ok()
            .map(|doc| doc.get_pages().len() as u32);

        // pdf-extract separates pages with form feeds when it emits them
        let pages: Vec<(u32, String)> = if raw.contains('\u{000C}') {
            raw.split('\u{000C}')
                .enumerate()
                .map(|(i, text)| (i as u32 + 1, cleanup_pdf_text(text)))
                .collect()
        } else {
            vec![(1, cleanup_pdf_text(&raw))]
        };
        let paginated = pages.len() > 1 || total_pages == Some(1);

        let mut parsed = ParsedDocument::from_pages(FileType::Pdf, pages, total_pages, paginated);
        parsed.metadata.insert("backend".to_string(), "pdf_extract".to_string());
        Ok(parsed)
    }

    /// Page-by-page extraction via lopdf, scanning content streams when
    /// lopdf's text decoder fails on a page
    fn parse_pdf_lopdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        if doc.is_encrypted() {
            return Err(Error::file_parse(filename, "PDF is encrypted"));
        }

        let page_map = doc.get_pages();
        let total_pages = page_map.len() as u32;
        let mut pages = Vec::with_capacity(page_map.len());

        for (page_num, page_id) in page_map {
            let text = match doc.extract_text(&[page_num]) {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) | Err(_) => match doc.get_page_content(page_id) {
                    Ok(content) => extract_text_from_content(&content),
                    Err(e) => {
                        tracing::debug!("Could not get content for page {}: {}", page_num, e);
                        String::new()
                    }
                },
            };
            pages.push((page_num, cleanup_pdf_text(&text)));
        }

        let mut parsed = ParsedDocument::from_pages(FileType::Pdf, pages, Some(total_pages), true);
        if parsed.is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }
        parsed.metadata.insert("backend".to_string(), "lopdf".to_string());
        Ok(parsed)
    }

    /// Parse plain text or markdown
    fn parse_text(data: &[u8], file_type: FileType) -> ParsedDocument {
        let content = String::from_utf8_lossy(data).replace('\0', "");
        let mut parsed = ParsedDocument::from_pages(file_type, vec![(1, content)], None, false);
        parsed.metadata.insert("backend".to_string(), "text".to_string());
        parsed
    }
}

/// Run pdf-extract on a helper thread so a pathological font cannot hang the run.
///
/// The thread cannot be cancelled; on timeout it is abandoned.
fn extract_pdf_with_timeout(filename: &str, data: &[u8], timeout: Duration) -> Result<String> {
    use std::sync::mpsc;
    use std::thread;

    let data_vec = data.to_vec();
    let (tx, rx) = mpsc::channel();

    let handle = thread::Builder::new()
        .name("pdf-extract".to_string())
        .spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result.map_err(|e| e.to_string()));
        })
        .map_err(|e| Error::internal(format!("cannot spawn pdf-extract thread: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(text)) => {
            let _ = handle.join();
            Ok(text)
        }
        Ok(Err(message)) => {
            let _ = handle.join();
            Err(Error::file_parse(filename, format!("pdf-extract: {}", message)))
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::error!(file = filename, "PDF extraction timeout after {:?}", timeout);
            Err(Error::file_parse(filename, format!("pdf-extract timed out after {:?}", timeout)))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            let _ = handle.join();
            Err(Error::file_parse(filename, "pdf-extract panicked"))
        }
    }
}

/// Extract text from PDF content stream bytes between BT and ET operators
fn extract_text_from_content(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let line = line.trim();

        if line == "BT" {
            in_text_block = true;
            continue;
        }

        if line == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push('\n');
                current_text.clear();
            }
            continue;
        }

        if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ") || line.ends_with('\'')) {
            if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                if start < end {
                    if !current_text.is_empty() {
                        current_text.push(' ');
                    }
                    current_text.push_str(&unescape_pdf_string(&line[start + 1..end]));
                }
            }
        }
    }

    text
}

/// Decode basic PDF literal string escapes
fn unescape_pdf_string(raw: &str) -> String {
    raw.replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
        .replace("\\(", "(")
        .replace("\\)", ")")
        .replace("\\\\", "\\")
}

/// Hash content for deduplication
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
