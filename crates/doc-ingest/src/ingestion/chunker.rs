//! Text chunking with page and position tracking

use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use super::parser::ParsedDocument;
use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::strategy::ChunkingStrategy;
use crate::types::{Chunk, ChunkSource};

/// A contiguous piece of the document to chunk independently
struct Segment<'a> {
    text: &'a str,
    /// Byte offset of `text` in the document content
    offset: usize,
    page_number: Option<u32>,
}

/// Splits parsed documents into chunks using one strategy
#[derive(Debug, Clone)]
pub struct Chunker {
    strategy: ChunkingStrategy,
    /// Upper bound on chunk length, in UTF-8 bytes
    chunk_size: usize,
    /// Bytes of tail text repeated at the start of the next chunk
    overlap: usize,
    /// Chunks shorter than this many bytes are dropped
    min_size: usize,
}

impl Chunker {
    /// Create a chunker; fails when the size/overlap pair is unusable
    pub fn new(strategy: ChunkingStrategy, config: &ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            strategy,
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            min_size: config.min_chunk_size,
        })
    }

    /// Create a chunker from a selector name
    pub fn from_name(chunking_strategy: &str, config: &ChunkingConfig) -> Result<Self> {
        Self::new(chunking_strategy.parse()?, config)
    }

    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }

    /// Chunk a parsed document; every chunk carries `source` as its path
    pub fn build_chunks(&self, parsed: &ParsedDocument, source: &Path) -> Vec<Chunk> {
        self.build_document_chunks(Uuid::new_v4(), parsed, source)
    }

    /// Chunk a parsed document belonging to a known document ID
    pub fn build_document_chunks(&self, document_id: Uuid, parsed: &ParsedDocument, source: &Path) -> Vec<Chunk> {
        let mut spans = Vec::new();

        for segment in self.segments(parsed) {
            let local = match self.strategy {
                ChunkingStrategy::Fixed => window_spans(segment.text, self.chunk_size, self.overlap),
                ChunkingStrategy::Sentence => self.sentence_spans(segment.text),
                ChunkingStrategy::Page => {
                    if segment.text.len() <= self.chunk_size {
                        vec![(0, segment.text.len())]
                    } else {
                        window_spans(segment.text, self.chunk_size, self.overlap)
                    }
                }
            };

            for (start, end) in local {
                if let Some((start, end)) = trim_span(segment.text, start, end) {
                    spans.push((segment.offset + start, segment.offset + end, segment.page_number));
                }
            }
        }

        // Short fragments are noise, unless they are all the document has
        if spans.iter().any(|(start, end, _)| end - start >= self.min_size) {
            spans.retain(|(start, end, _)| end - start >= self.min_size);
        }

        spans
            .into_iter()
            .enumerate()
            .map(|(index, (start, end, page_number))| {
                let mut chunk_source = ChunkSource::new(source, self.strategy);
                chunk_source.page_number = page_number;
                chunk_source.page_count = parsed.total_pages;
                Chunk::new(
                    document_id,
                    parsed.content[start..end].to_string(),
                    chunk_source,
                    start,
                    end,
                    index as u32,
                )
            })
            .collect()
    }

    /// Page-aware documents are chunked page by page, everything else whole
    fn segments<'a>(&self, parsed: &'a ParsedDocument) -> Vec<Segment<'a>> {
        if parsed.pages.len() > 1 {
            parsed
                .pages
                .iter()
                .map(|page| Segment {
                    text: &parsed.content[page.byte_offset..page.byte_offset + page.content.len()],
                    offset: page.byte_offset,
                    page_number: parsed.paginated.then_some(page.page_number),
                })
                .collect()
        } else {
            let page_number = if parsed.paginated {
                parsed.pages.first().map(|p| p.page_number)
            } else {
                None
            };
            vec![Segment {
                text: &parsed.content,
                offset: 0,
                page_number,
            }]
        }
    }

    /// Pack whole sentences up to the chunk size, carrying an overlap tail
    fn sentence_spans(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut current: Option<(usize, usize)> = None;

        for (offset, sentence) in text.split_sentence_bound_indices() {
            let sentence_end = offset + sentence.len();

            if sentence.len() > self.chunk_size {
                if let Some(span) = current.take() {
                    spans.push(span);
                }
                spans.extend(
                    window_spans(sentence, self.chunk_size, self.overlap)
                        .into_iter()
                        .map(|(s, e)| (offset + s, offset + e)),
                );
                continue;
            }

            current = match current {
                Some((start, end)) if end - start + sentence.len() > self.chunk_size => {
                    spans.push((start, end));
                    // Carried tail plus the new sentence must still fit
                    let carry = self.overlap.min(self.chunk_size - sentence.len());
                    Some((overlap_start(text, start, end, carry), sentence_end))
                }
                Some((start, _)) => Some((start, sentence_end)),
                None => Some((offset, sentence_end)),
            };
        }

        if let Some(span) = current {
            spans.push(span);
        }
        spans
    }
}

/// Fixed-size windows over `text`, each advancing by `size - overlap`.
///
/// Window ends snap back to whitespace found in the second half of the
/// window; all offsets are char boundaries.
fn window_spans(text: &str, size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let len = text.len();
    let mut spans = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = floor_char_boundary(text, (start + size).min(len));
        if end <= start {
            end = ceil_char_boundary(text, start + 1);
        }

        if end < len {
            let window = &text[start..end];
            if let Some(ws) = window.rfind(char::is_whitespace) {
                if ws > 0 && ws >= window.len() / 2 {
                    end = start + ws;
                }
            }
        }

        spans.push((start, end));
        if end >= len {
            break;
        }

        let next = overlap_start(text, start, end, overlap);
        start = if next > start { next } else { end };
    }

    spans
}

/// Where a chunk that overlaps the tail of `[start, end)` should begin:
/// at most `overlap` bytes back from `end`, moved forward to a word start.
/// Returns `end` (no overlap) when the tail holds no word boundary.
fn overlap_start(text: &str, start: usize, end: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return end;
    }
    let next = ceil_char_boundary(text, end.saturating_sub(overlap).max(start));
    if next <= start || next >= end || text[..next].ends_with(char::is_whitespace) {
        return next;
    }
    match text[next..end].find(char::is_whitespace) {
        Some(ws) => next + ws,
        None => end,
    }
}

/// Shrink a span to exclude surrounding whitespace; `None` if nothing remains
fn trim_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let trimmed_start = slice.len() - slice.trim_start().len();
    let trimmed_end = slice.trim_end().len();
    if trimmed_end <= trimmed_start {
        None
    } else {
        Some((start + trimmed_start, start + trimmed_end))
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::parser::PageContent;
    use crate::types::FileType;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn doc(pages: &[&str]) -> ParsedDocument {
        ParsedDocument::from_pages(
            FileType::Pdf,
            pages.iter().enumerate().map(|(i, p)| (i as u32 + 1, p.to_string())).collect(),
            Some(pages.len() as u32),
            true,
        )
    }

    fn config(chunk_size: usize, chunk_overlap: usize, min_chunk_size: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            chunk_overlap,
            min_chunk_size,
        }
    }

    #[test]
    fn test_fixed_windows_overlap_and_respect_size() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let chunker = Chunker::new(ChunkingStrategy::Fixed, &config(20, 6, 0)).unwrap();
        let chunks = chunker.build_chunks(&doc(&[text]), Path::new("a.pdf"));

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            assert!(pair[1].byte_start < pair[0].byte_end, "consecutive windows overlap");
        }
        for chunk in &chunks {
            assert!(chunk.content.len() <= 20);
            assert!(!chunk.content.starts_with(' '));
        }
        assert!(chunks.last().unwrap().content.ends_with("mu"));
    }

    #[test]
    fn test_chunks_carry_source_and_page() {
        let chunker = Chunker::new(ChunkingStrategy::Fixed, &config(1024, 100, 0)).unwrap();
        let chunks = chunker.build_chunks(&doc(&["page one text", "page two text"]), Path::new("docs/a.pdf"));

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.source.path == Path::new("docs/a.pdf")));
        assert_eq!(chunks[0].source.page_number, Some(1));
        assert_eq!(chunks[1].source.page_number, Some(2));
        assert_eq!(chunks[1].source.page_count, Some(2));
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn test_sentence_strategy_keeps_sentences_whole() {
        let text = "The cat sat. The dog ran far away. Birds sang loudly today. Fish swam.";
        let chunker = Chunker::new(ChunkingStrategy::Sentence, &config(40, 0, 0)).unwrap();
        let chunks = chunker.build_chunks(&doc(&[text]), Path::new("a.pdf"));

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["The cat sat. The dog ran far away.", "Birds sang loudly today. Fish swam."]
        );
    }

    #[test]
    fn test_sentence_overlap_starts_on_word() {
        let text = "First sentence is here. Second sentence follows it. Third one ends.";
        let chunker = Chunker::new(ChunkingStrategy::Sentence, &config(40, 12, 0)).unwrap();
        let chunks = chunker.build_chunks(&doc(&[text]), Path::new("a.pdf"));

        assert!(chunks.len() >= 2);
        assert!(chunks[1].byte_start < chunks[0].byte_end);
        assert!(chunks[1].content.starts_with("is here."));
        let first_word = chunks[1].content.split_whitespace().next().unwrap();
        assert!(text.split_whitespace().any(|w| w == first_word));
    }

    #[test]
    fn test_sentence_overlap_never_exceeds_chunk_size() {
        let text = "Alpha beta gamma delta eps. Zeta eta theta iota kap. Lambda mu nu xi omicron.";
        let chunker = Chunker::new(ChunkingStrategy::Sentence, &config(30, 20, 0)).unwrap();
        let chunks = chunker.build_chunks(&doc(&[text]), Path::new("a.pdf"));

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.content.len() <= 30, "{:?} is {} bytes", chunk.content, chunk.content.len());
        }
        assert!(chunks[1].content.ends_with("kap."));
        assert!(chunks[2].content.ends_with("omicron."));
    }

    #[test]
    fn test_overlap_without_word_boundary_is_dropped() {
        let text = "alpha bravocharliedelta";
        assert_eq!(overlap_start(text, 0, text.len(), 5), text.len());

        let text = "alpha bravo charlie";
        assert_eq!(overlap_start(text, 0, text.len(), 9), 11);
        assert_eq!(overlap_start(text, 0, text.len(), 0), text.len());
    }

    #[test]
    fn test_page_strategy_one_chunk_per_page() {
        let chunker = Chunker::new(ChunkingStrategy::Page, &config(1024, 0, 0)).unwrap();
        let chunks = chunker.build_chunks(&doc(&["one", "two", "three"]), Path::new("a.pdf"));
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_min_size_keeps_lone_short_chunk() {
        let chunker = Chunker::new(ChunkingStrategy::Fixed, &config(1024, 0, 50)).unwrap();
        let chunks = chunker.build_chunks(&doc(&["tiny"]), Path::new("a.pdf"));
        assert_eq!(chunks.len(), 1);

        let chunks = chunker.build_chunks(&doc(&["tiny", &"long page text ".repeat(10)]), Path::new("a.pdf"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].source.page_number, Some(2));
    }

    #[test]
    fn test_min_size_keeps_short_pages_when_nothing_longer_exists() {
        let chunker = Chunker::new(ChunkingStrategy::Fixed, &ChunkingConfig::default()).unwrap();
        let chunks = chunker.build_chunks(&doc(&["Slide one title", "Slide two title"]), Path::new("deck.pdf"));

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["Slide one title", "Slide two title"]);
        assert_eq!(chunks[1].source.page_number, Some(2));
    }

    #[test]
    fn test_unpaginated_text_has_no_page_number() {
        let parsed = ParsedDocument {
            file_type: FileType::Txt,
            content: "plain text body".into(),
            content_hash: String::new(),
            total_pages: None,
            pages: vec![PageContent {
                page_number: 1,
                content: "plain text body".into(),
                byte_offset: 0,
            }],
            paginated: false,
            metadata: HashMap::new(),
        };
        let chunker = Chunker::new(ChunkingStrategy::Page, &config(1024, 0, 0)).unwrap();
        let chunks = chunker.build_chunks(&parsed, Path::new("a.txt"));
        assert_eq!(chunks[0].source.page_number, None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Chunker::new(ChunkingStrategy::Fixed, &config(10, 10, 0)).is_err());
        assert!(Chunker::from_name("semantic", &ChunkingConfig::default()).is_err());
    }

    #[test]
    fn test_multibyte_text_stays_on_char_boundaries() {
        let text = "naïve café résumé über straße ".repeat(20);
        let chunker = Chunker::new(ChunkingStrategy::Fixed, &config(17, 5, 0)).unwrap();
        let chunks = chunker.build_chunks(&doc(&[&text]), Path::new("a.pdf"));
        assert!(!chunks.is_empty());
        // Sizes count bytes, so a window holds fewer multibyte chars
        for chunk in &chunks {
            assert!(chunk.content.len() <= 17);
        }
    }

    fn any_chunking_strategy() -> impl Strategy<Value = ChunkingStrategy> {
        prop_oneof![
            Just(ChunkingStrategy::Fixed),
            Just(ChunkingStrategy::Sentence),
            Just(ChunkingStrategy::Page),
        ]
    }

    proptest! {
        #[test]
        fn prop_chunks_index_into_content_and_cover_it(
            pages in proptest::collection::vec("[a-zé .!?\n]{0,200}", 1..4),
            size in 8usize..120,
            overlap_pct in 0usize..90,
            strategy in any_chunking_strategy(),
        ) {
            let overlap = size * overlap_pct / 100;
            let page_refs: Vec<&str> = pages.iter().map(String::as_str).collect();
            let parsed = doc(&page_refs);
            let chunker = Chunker::new(strategy, &config(size, overlap, 0)).unwrap();
            let chunks = chunker.build_chunks(&parsed, Path::new("p.pdf"));

            let mut covered = vec![false; parsed.content.len()];
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.chunk_index as usize, i);
                prop_assert_eq!(&chunk.source.path, Path::new("p.pdf"));
                prop_assert!(!chunk.content.trim().is_empty());
                prop_assert_eq!(&parsed.content[chunk.byte_start..chunk.byte_end], chunk.content.as_str());
                prop_assert!(chunk.content.len() <= size, "{:?} chunk of {} bytes", strategy, chunk.content.len());
                for flag in &mut covered[chunk.byte_start..chunk.byte_end] {
                    *flag = true;
                }
            }

            for (i, ch) in parsed.content.char_indices() {
                if !ch.is_whitespace() {
                    prop_assert!(covered[i], "byte {} not covered", i);
                }
            }
        }
    }
}
