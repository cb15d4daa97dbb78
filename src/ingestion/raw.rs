//! Named byte blobs handed to the pipeline.

use std::fs;
use std::path::Path;

use crate::error::IngestionResult;

/// An uploaded file: a declared name (used for format dispatch and error reporting) plus its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    /// Declared file name, including its extension.
    pub name: String,
    /// File content.
    pub content: Vec<u8>,
}

impl RawFile {
    /// Create a file from a name and in-memory content.
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk. The declared name is the path's final component.
    pub fn from_path(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let path = path.as_ref();
        let content = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, content })
    }

    /// The lowercase extension of the declared name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
    }
}
