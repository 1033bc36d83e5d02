//! Tables and images pulled out of documents

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use uuid::Uuid;

/// A table detected in a page's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// Originating file path
    pub source: PathBuf,
    /// Page the table was found on (1-indexed)
    pub page_number: u32,
    /// Cell text, row-major; every row has the same length
    pub rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render as a markdown table, first row as header
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for (i, row) in self.rows.iter().enumerate() {
            out.push_str("| ");
            out.push_str(&row.join(" | "));
            out.push_str(" |\n");
            if i == 0 {
                out.push('|');
                out.push_str(&" --- |".repeat(row.len()));
                out.push('\n');
            }
        }
        out
    }
}

/// Encoding of an extracted image stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// DCTDecode: the stream is a JPEG file
    Jpeg,
    /// JPXDecode: the stream is a JPEG 2000 codestream
    Jpeg2000,
    /// CCITT fax group 3/4
    Ccitt,
    /// JBIG2 bilevel
    Jbig2,
    /// Decompressed raw samples (Width x Height x components)
    Raw,
}

impl ImageFormat {
    /// File extension used when saving
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Jpeg2000 => "jp2",
            ImageFormat::Ccitt => "ccitt",
            ImageFormat::Jbig2 => "jbig2",
            ImageFormat::Raw => "raw",
        }
    }
}

/// An image embedded in a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDocument {
    pub id: Uuid,
    /// Originating file path
    pub source: PathBuf,
    /// Page the image is placed on (1-indexed)
    pub page_number: u32,
    /// Resource name on the page (e.g. `Im1`)
    pub name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bits_per_component: Option<u32>,
    pub color_space: Option<String>,
    pub format: ImageFormat,
    /// Encoded image bytes
    #[serde(skip)]
    pub data: Vec<u8>,
    pub byte_len: usize,
    /// Where the image was written, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_path: Option<PathBuf>,
}

impl ImageDocument {
    /// File name used when saving: `<stem>-<tag>_p<page>_<name>.<ext>`.
    ///
    /// `tag` is derived from the full source path, so files sharing a stem
    /// in different directories get distinct names.
    pub fn file_name(&self) -> String {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let name: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!(
            "{}-{}_p{}_{}.{}",
            stem,
            self.source_tag(),
            self.page_number,
            name,
            self.format.extension()
        )
    }

    /// First 8 hex digits of the SHA-256 of the source path
    pub fn source_tag(&self) -> String {
        let digest = Sha256::digest(self.source.to_string_lossy().as_bytes());
        digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_markdown() {
        let table = ExtractedTable {
            source: PathBuf::from("a.pdf"),
            page_number: 1,
            rows: vec![
                vec!["Gene".into(), "Score".into()],
                vec!["KRAS".into(), "0.91".into()],
            ],
        };
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.to_markdown(), "| Gene | Score |\n| --- | --- |\n| KRAS | 0.91 |\n");
    }

    fn image(source: &str, page_number: u32, name: &str) -> ImageDocument {
        ImageDocument {
            id: Uuid::new_v4(),
            source: PathBuf::from(source),
            page_number,
            name: name.into(),
            width: Some(10),
            height: Some(10),
            bits_per_component: Some(8),
            color_space: None,
            format: ImageFormat::Jpeg,
            data: Vec::new(),
            byte_len: 0,
            saved_path: None,
        }
    }

    #[test]
    fn test_image_file_name_is_sanitised() {
        let image = image("/tmp/docs/annual report.pdf", 4, "Im/1");
        let tag = image.source_tag();
        assert_eq!(tag.len(), 8);
        assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(image.file_name(), format!("annual report-{}_p4_Im_1.jpg", tag));
    }

    #[test]
    fn test_same_stem_in_different_directories_gets_distinct_names() {
        let x = image("docs/x/scan.pdf", 1, "Im1");
        let y = image("docs/y/scan.pdf", 1, "Im1");
        assert_ne!(x.file_name(), y.file_name());
        assert_eq!(x.file_name(), image("docs/x/scan.pdf", 1, "Im1").file_name());
    }
}
