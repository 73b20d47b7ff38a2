//! Core types for the ingestion pipeline

pub mod document;
pub mod record;

pub use document::{DocumentMetadata, DocumentPath, ExtractedText, RawExtraction};
pub use record::{BatchResult, ItemOutcome, ValidatedRecord};
