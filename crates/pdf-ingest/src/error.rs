//! Error types for the ingestion pipeline
//!
//! Two layers: [`Error`] is what crosses the orchestrator boundary (hard
//! failures), [`ErrorKind`] is the per-document taxonomy that travels through
//! the pipeline as data and ends up in the run report.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::DocumentPath;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Hard failures surfaced to the caller
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration, rejected before any work is dispatched
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input directory missing or unreadable
    #[error("Failed to discover documents in '{}': {cause}", path.display())]
    Discovery { path: PathBuf, cause: String },

    /// Final output write failed
    #[error("Failed to persist output to '{}': {cause}", target.display())]
    Persistence { target: PathBuf, cause: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a discovery error
    pub fn discovery(path: impl Into<PathBuf>, cause: impl ToString) -> Self {
        Self::Discovery {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Create a persistence error
    pub fn persistence(target: impl Into<PathBuf>, cause: impl ToString) -> Self {
        Self::Persistence {
            target: target.into(),
            cause: cause.to_string(),
        }
    }

    /// Per-item view of this error, if it has one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Persistence { target, cause } => Some(ErrorKind::PersistenceFailure {
                target: target.clone(),
                cause: cause.clone(),
            }),
            _ => None,
        }
    }
}

/// Per-document failure categories, carried as data rather than raised
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Document could not be opened or parsed
    #[error("failed to read '{path}': {cause}")]
    ReadFailure { path: DocumentPath, cause: String },

    /// Resource exhaustion while reading
    #[error("memory exhausted while reading '{path}'")]
    MemoryExhausted { path: DocumentPath },

    /// Anything the reader could not classify (including extractor panics)
    #[error("unclassified failure reading '{path}': {cause}")]
    Unclassified { path: DocumentPath, cause: String },

    /// Extracted content rejected by a content rule
    #[error("invalid content in '{path}': {reason}")]
    ValidationFailure { path: DocumentPath, reason: String },

    /// Output could not be written
    #[error("failed to persist '{}': {cause}", target.display())]
    PersistenceFailure { target: PathBuf, cause: String },
}

impl ErrorKind {
    /// Map a classified extractor failure onto the taxonomy
    pub fn from_extract(path: &DocumentPath, err: ExtractError) -> Self {
        match err {
            ExtractError::Malformed(cause) => Self::ReadFailure {
                path: path.clone(),
                cause,
            },
            ExtractError::Io(e) if e.kind() == std::io::ErrorKind::OutOfMemory => {
                Self::MemoryExhausted { path: path.clone() }
            }
            ExtractError::Io(e) => Self::ReadFailure {
                path: path.clone(),
                cause: e.to_string(),
            },
            ExtractError::ResourceExhausted(_) => Self::MemoryExhausted { path: path.clone() },
            ExtractError::Other(cause) => Self::Unclassified {
                path: path.clone(),
                cause,
            },
        }
    }

    /// Document path this failure belongs to; `None` for persistence failures
    pub fn path(&self) -> Option<&DocumentPath> {
        match self {
            Self::ReadFailure { path, .. }
            | Self::MemoryExhausted { path }
            | Self::Unclassified { path, .. }
            | Self::ValidationFailure { path, .. } => Some(path),
            Self::PersistenceFailure { .. } => None,
        }
    }

    /// Short stable label, used in logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReadFailure { .. } => "read_failure",
            Self::MemoryExhausted { .. } => "memory_exhausted",
            Self::Unclassified { .. } => "unclassified",
            Self::ValidationFailure { .. } => "validation_failure",
            Self::PersistenceFailure { .. } => "persistence_failure",
        }
    }
}

/// Classified failure at the page-extraction boundary
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Structurally broken document
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Filesystem failure (permission denied, missing file, ...)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document too large or allocation failure
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}
