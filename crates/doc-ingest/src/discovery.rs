//! Input discovery: resolve a path or glob pattern to the supported files
//! it names.

use std::path::{Path, PathBuf};

use crate::config::DiscoveryConfig;

/// Extensions accepted when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["pdf"];

/// Resolves input locations to supported files
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// Lowercased, without the leading dot
    extensions: Vec<String>,
}

impl FileDiscovery {
    /// Create a discovery for the given extensions (`".pdf"` and `"pdf"` are equivalent)
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        let extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(&config.extensions)
    }

    /// Whether a path's extension is in the supported set
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let ext = e.to_lowercase();
                self.extensions.iter().any(|s| *s == ext)
            })
            .unwrap_or(false)
    }

    /// List supported files named by `input`, in discovery order.
    ///
    /// Glob patterns are expanded; any other input is a single candidate.
    /// A bare directory names no file, so recursion needs a pattern such as
    /// `dir/**/*.pdf`. Nothing found is an empty list, never an error.
    pub fn discover(&self, input: &str) -> Vec<PathBuf> {
        let candidates = if is_glob_pattern(input) {
            expand_glob(input)
        } else {
            let path = Path::new(input);
            if path.is_dir() {
                tracing::warn!(input, "Input is a directory, not a file; use a pattern like '{}/*.pdf'", input);
            }
            vec![path.to_path_buf()]
        };

        let files: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|p| p.is_file() && self.is_supported(p))
            .collect();

        tracing::debug!(input, found = files.len(), "Discovered supported files");
        files
    }

}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

/// List all supported files in the given input path.
pub fn list_supported_files<S: AsRef<str>>(input_path: &str, supported_extensions: &[S]) -> Vec<PathBuf> {
    FileDiscovery::new(supported_extensions).discover(input_path)
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

fn expand_glob(pattern: &str) -> Vec<PathBuf> {
    match glob::glob(pattern) {
        Ok(paths) => paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::debug!("Skipping unreadable glob entry: {}", e);
                    None
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!(pattern, "Invalid glob pattern: {}", e);
            Vec::new()
        }
    }
}
