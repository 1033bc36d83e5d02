//! Table detection over extracted page text
//!
//! PDF text extraction flattens tables into lines whose cells are separated
//! by pipes, tabs or runs of spaces. A run of consecutive lines that split
//! into the same number of cells is reported as one table.

use std::path::Path;

use super::parser::ParsedDocument;
use crate::config::ParsingConfig;
use crate::types::ExtractedTable;

/// Finds column-aligned runs of lines in text
#[derive(Debug, Clone)]
pub struct TableDetector {
    min_rows: usize,
    min_columns: usize,
}

impl TableDetector {
    pub fn new(min_rows: usize, min_columns: usize) -> Self {
        Self {
            min_rows: min_rows.max(2),
            min_columns: min_columns.max(2),
        }
    }

    pub fn from_config(config: &ParsingConfig) -> Self {
        Self::new(config.min_table_rows, config.min_table_columns)
    }

    /// Detect tables in a block of text, returning each as rows of cells
    pub fn detect(&self, text: &str) -> Vec<Vec<Vec<String>>> {
        let mut tables = Vec::new();
        let mut current: Vec<Vec<String>> = Vec::new();

        for line in text.lines() {
            let cells = split_cells(line);

            if is_separator_row(&cells) {
                continue;
            }

            if cells.len() < self.min_columns {
                self.flush(&mut current, &mut tables);
                continue;
            }

            if current.first().is_some_and(|row| row.len() != cells.len()) {
                self.flush(&mut current, &mut tables);
            }
            current.push(cells);
        }
        self.flush(&mut current, &mut tables);

        tables
    }

    /// Detect tables page by page in a parsed document
    pub fn detect_in_document(&self, parsed: &ParsedDocument, source: &Path) -> Vec<ExtractedTable> {
        parsed
            .pages
            .iter()
            .flat_map(|page| {
                self.detect(&page.content)
                    .into_iter()
                    .map(move |rows| ExtractedTable {
                        source: source.to_path_buf(),
                        page_number: page.page_number,
                        rows,
                    })
            })
            .collect()
    }

    fn flush(&self, current: &mut Vec<Vec<String>>, tables: &mut Vec<Vec<Vec<String>>>) {
        if current.len() >= self.min_rows {
            tables.push(std::mem::take(current));
        } else {
            current.clear();
        }
    }
}

impl Default for TableDetector {
    fn default() -> Self {
        Self::new(2, 2)
    }
}

/// Split a line into cells on pipes, tabs, or runs of two or more spaces
fn split_cells(line: &str) -> Vec<String> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }

    if line.contains('|') {
        let mut cells: Vec<&str> = line.split('|').map(str::trim).collect();
        if cells.first() == Some(&"") {
            cells.remove(0);
        }
        if cells.last() == Some(&"") {
            cells.pop();
        }
        return cells.into_iter().map(String::from).collect();
    }

    let separator = if line.contains('\t') { "\t" } else { "  " };
    line.split(separator)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

/// Markdown-style rule rows such as `---|:---:`
fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|c| {
            !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':' | '=' | '+'))
        })
}
