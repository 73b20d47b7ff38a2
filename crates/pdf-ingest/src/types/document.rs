//! Per-document types produced by the reading stage

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ErrorKind;

/// Identifies one input document. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(PathBuf);

impl DocumentPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Final path component, lossily decoded
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.to_string_lossy().into_owned())
    }

    /// File name without extension
    pub fn stem(&self) -> String {
        self.0
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl Serialize for DocumentPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string_lossy())
    }
}

impl From<PathBuf> for DocumentPath {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for DocumentPath {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

/// Document information dictionary entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
}

impl DocumentMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.creation_date.is_none()
    }
}

/// Successfully extracted text of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Page texts joined in page order with a single space, trimmed
    pub text: String,
    /// Number of pages the extractor reported
    pub page_count: usize,
    /// Information dictionary entries, when present
    pub metadata: DocumentMetadata,
}

/// Outcome of reading one document: text or a classified error, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExtraction {
    pub path: DocumentPath,
    pub content: Result<ExtractedText, ErrorKind>,
}

impl RawExtraction {
    pub fn text(path: DocumentPath, extracted: ExtractedText) -> Self {
        Self {
            path,
            content: Ok(extracted),
        }
    }

    pub fn failed(path: DocumentPath, error: ErrorKind) -> Self {
        Self {
            path,
            content: Err(error),
        }
    }

    /// Extracted text, if the read succeeded
    pub fn extracted_text(&self) -> Option<&str> {
        self.content.as_ref().ok().map(|extracted| extracted.text.as_str())
    }

    /// Classified failure, if the read failed
    pub fn error(&self) -> Option<&ErrorKind> {
        self.content.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.content.is_ok()
    }
}
