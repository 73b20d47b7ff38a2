//! Turns the completion stream into a [`BatchResult`]

use tracing::Span;

use super::validator::ContentValidator;
use crate::types::{BatchResult, ItemOutcome, RawExtraction};

/// Consumes raw extractions, validates them and tallies per-item outcomes.
///
/// Records are appended in the order extractions arrive. With more than one
/// reader worker that order differs from run to run.
pub struct BatchAggregator {
    validator: ContentValidator,
    span: Span,
}

impl BatchAggregator {
    pub fn new(validator: ContentValidator, span: Span) -> Self {
        Self { validator, span }
    }

    pub fn aggregate<I>(&self, extractions: I) -> BatchResult
    where
        I: IntoIterator<Item = RawExtraction>,
    {
        let mut result = BatchResult::new();

        for raw in extractions {
            let outcome = self.accept(raw, &mut result);
            result.tally(outcome);
        }

        tracing::info!(
            parent: &self.span,
            "Aggregated {} item(s): {} succeeded, {} empty, {} rejected, {} failed",
            result.total(),
            result.succeeded,
            result.skipped_empty,
            result.rejected_invalid,
            result.failed_read
        );
        if !result.has_records() {
            tracing::warn!(parent: &self.span, "No valid records in batch");
        }

        result
    }

    fn accept(&self, raw: RawExtraction, result: &mut BatchResult) -> ItemOutcome {
        let RawExtraction { path, content } = raw;

        let extracted = match content {
            Ok(extracted) => extracted,
            Err(kind) => {
                tracing::warn!(parent: &self.span, "Skipping {}: {}", path, kind);
                result.errors.push(kind);
                return ItemOutcome::FailedRead;
            }
        };

        if extracted.text.trim().is_empty() {
            tracing::warn!(parent: &self.span, "No text extracted from {}", path);
            return ItemOutcome::SkippedEmpty;
        }

        match self.validator.validate(&path, &extracted.text) {
            Ok(record) => {
                result
                    .records
                    .push(record.with_source(extracted.page_count, extracted.metadata));
                ItemOutcome::Succeeded
            }
            Err(kind) => {
                tracing::warn!(parent: &self.span, "Rejected {}: {}", path, kind);
                result.errors.push(kind);
                ItemOutcome::RejectedInvalid
            }
        }
    }
}
