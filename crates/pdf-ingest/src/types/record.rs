//! Validated records and batch-level results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::DocumentMetadata;
use crate::error::ErrorKind;

/// One accepted document, as written to the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    /// Base name of the source document
    pub file_name: String,
    /// Normalised text content
    pub content: String,
    /// When the content was accepted
    pub extracted_at: DateTime<Utc>,
    /// SHA-256 of `content`, hex encoded
    pub content_hash: String,
    /// Page count reported by the reader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    /// Information dictionary entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

impl ValidatedRecord {
    /// Attach reader-side details; empty metadata is dropped
    pub fn with_source(mut self, page_count: usize, metadata: DocumentMetadata) -> Self {
        self.page_count = Some(page_count);
        self.metadata = (!metadata.is_empty()).then_some(metadata);
        self
    }
}

/// Final disposition of a single document within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded,
    SkippedEmpty,
    RejectedInvalid,
    FailedRead,
}

/// Aggregated outcome of one batch
///
/// `records` is in arrival order of the completion stream, which is not the
/// discovery order. Compare record sets, not sequences.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub records: Vec<ValidatedRecord>,
    pub succeeded: usize,
    pub skipped_empty: usize,
    pub rejected_invalid: usize,
    pub failed_read: usize,
    /// Every per-item failure seen, in arrival order
    pub errors: Vec<ErrorKind>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one item's outcome
    pub fn tally(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Succeeded => self.succeeded += 1,
            ItemOutcome::SkippedEmpty => self.skipped_empty += 1,
            ItemOutcome::RejectedInvalid => self.rejected_invalid += 1,
            ItemOutcome::FailedRead => self.failed_read += 1,
        }
    }

    /// Number of items accounted for
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped_empty + self.rejected_invalid + self.failed_read
    }

    /// False means "nothing to persist"
    pub fn has_records(&self) -> bool {
        self.succeeded > 0
    }
}
