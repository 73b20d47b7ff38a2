//! Single-document reader: text extraction with failure classification

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::Span;

use super::extractor::{ExtractedPages, PageExtractor};
use crate::error::ErrorKind;
use crate::types::{DocumentPath, ExtractedText, RawExtraction};

/// Reads one document into a [`RawExtraction`].
///
/// Never fails past its own boundary: extractor errors and extractor panics
/// are turned into an `ErrorKind` tagged with the offending path. Cheap to
/// clone; clones share the extractor and the log span.
#[derive(Clone)]
pub struct DocumentReader {
    extractor: Arc<dyn PageExtractor>,
    span: Span,
}

impl DocumentReader {
    /// Create a reader that logs under `span`
    pub fn new(extractor: Arc<dyn PageExtractor>, span: Span) -> Self {
        Self { extractor, span }
    }

    /// Extract and join the text of `path`
    pub fn read(&self, path: &DocumentPath) -> RawExtraction {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            self.extractor.extract_pages(path.as_path())
        }));

        match attempt {
            Ok(Ok(extracted)) => {
                let extracted = into_text(extracted);
                tracing::info!(
                    parent: &self.span,
                    "Read '{}': {} pages, {} chars",
                    path,
                    extracted.page_count,
                    extracted.text.len()
                );
                RawExtraction::text(path.clone(), extracted)
            }
            Ok(Err(err)) => {
                let kind = ErrorKind::from_extract(path, err);
                match kind {
                    ErrorKind::ReadFailure { .. } => {
                        tracing::warn!(parent: &self.span, "[{}] {}", kind.label(), kind)
                    }
                    _ => tracing::error!(parent: &self.span, "[{}] {}", kind.label(), kind),
                }
                RawExtraction::failed(path.clone(), kind)
            }
            Err(payload) => {
                let kind = classify_panic(path, payload.as_ref());
                tracing::error!(parent: &self.span, "[{}] extractor panicked: {}", kind.label(), kind);
                RawExtraction::failed(path.clone(), kind)
            }
        }
    }
}

fn into_text(extracted: ExtractedPages) -> ExtractedText {
    ExtractedText {
        text: join_pages(&extracted.pages),
        page_count: extracted.page_count,
        metadata: extracted.metadata,
    }
}

/// Page texts in document order, single-space separated, trimmed
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let parts: Vec<&str> = pages.iter().map(|page| page.as_ref()).collect();
    parts.join(" ").trim().to_string()
}

/// Panic payloads are `&str` or `String` in practice; allocation failures
/// surface as capacity/allocation messages
pub(crate) fn classify_panic(path: &DocumentPath, payload: &(dyn Any + Send)) -> ErrorKind {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    let lower = message.to_lowercase();
    if lower.contains("capacity overflow") || lower.contains("memory allocation") {
        ErrorKind::MemoryExhausted { path: path.clone() }
    } else {
        ErrorKind::Unclassified {
            path: path.clone(),
            cause: format!("panic: {}", message),
        }
    }
}
