//! Configuration for the ingestion pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default number of reader workers
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Where documents are discovered
    #[serde(default)]
    pub input: InputConfig,
    /// Where results are written
    #[serde(default)]
    pub output: OutputConfig,
    /// Worker pool settings
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Content normalisation and rules
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Image side-pipeline
    #[serde(default)]
    pub images: ImageConfig,
}

impl IngestConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "cannot read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Reject settings that would make a run meaningless. Called before any
    /// work is dispatched.
    pub fn validate(&self) -> Result<()> {
        if self.processing.concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        if self.output.dir.as_os_str().is_empty() {
            return Err(Error::config("output directory must not be empty"));
        }
        ensure_not_file(&self.output.dir, "output directory")?;
        if self.images.enabled {
            ensure_not_file(&self.images.dir_or(&self.output.dir), "image directory")?;
        }
        if self.input.extensions.is_empty() {
            return Err(Error::config("at least one input extension is required"));
        }
        if let Some(name) = &self.output.file_name {
            if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
                return Err(Error::config(format!("invalid output file name '{}'", name)));
            }
        }
        if self.processing.max_document_bytes == Some(0) {
            return Err(Error::config("max_document_bytes must be positive when set"));
        }
        Ok(())
    }
}

/// A destination may be missing (it is created on write) but must not be a
/// regular file
fn ensure_not_file(dir: &Path, what: &str) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::config(format!(
            "{} '{}' exists and is not a directory",
            what,
            dir.display()
        )));
    }
    Ok(())
}

/// Input discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory walked recursively for documents
    #[serde(default = "default_input_dir")]
    pub dir: PathBuf,
    /// File extensions to keep (case-insensitive, without dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Follow symbolic links while walking
    #[serde(default = "default_follow_links")]
    pub follow_links: bool,
}

fn default_input_dir() -> PathBuf { PathBuf::from("pdfs") }
fn default_extensions() -> Vec<String> { vec!["pdf".to_string()] }
fn default_follow_links() -> bool { true }

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_input_dir(),
            extensions: default_extensions(),
            follow_links: default_follow_links(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, created if missing
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Fixed output file name. When unset each run writes
    /// `extracted_data_<YYYYmmdd_HHMMSS>.json`.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Pretty-print the JSON document
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }
fn default_pretty() -> bool { true }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_name: None,
            pretty: default_pretty(),
        }
    }
}

impl OutputConfig {
    /// File name for a run started at `now`
    pub fn file_name_at(&self, now: DateTime<Utc>) -> String {
        match &self.file_name {
            Some(name) => name.clone(),
            None => format!("extracted_data_{}.json", now.format("%Y%m%d_%H%M%S")),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of parallel reader workers (default: 4)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Documents larger than this are classified as memory exhausted
    /// without being loaded
    #[serde(default)]
    pub max_document_bytes: Option<u64>,
}

fn default_concurrency() -> usize { DEFAULT_CONCURRENCY }

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_document_bytes: None,
        }
    }
}

/// Content validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Substrings that must all appear in the content. Empty disables the check.
    #[serde(default)]
    pub required_markers: Vec<String>,
    /// Minimum content length in characters after normalisation
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    /// Collapse whitespace runs to a single space
    #[serde(default = "default_collapse_whitespace")]
    pub collapse_whitespace: bool,
    /// Replace non-ASCII runs with a single space
    #[serde(default)]
    pub ascii_only: bool,
}

fn default_min_chars() -> usize { 1 }
fn default_collapse_whitespace() -> bool { true }

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            required_markers: Vec::new(),
            min_chars: default_min_chars(),
            collapse_whitespace: default_collapse_whitespace(),
            ascii_only: false,
        }
    }
}

/// Image extraction configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Extract embedded images alongside text
    #[serde(default)]
    pub enabled: bool,
    /// Target directory (default: `<output.dir>/images`)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl ImageConfig {
    /// Resolved image directory
    pub fn dir_or(&self, output_dir: &Path) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| output_dir.join("images"))
    }
}
