//! pdf-ingest: concurrent PDF ingestion
//!
//! Discovers documents in a directory tree, reads them on a bounded pool of
//! worker threads, validates and normalises the extracted text, and writes the
//! accepted records as one JSON document. A document that fails to read or
//! validate is counted and reported; it never aborts the batch.
//!
//! ```no_run
//! use pdf_ingest::{IngestConfig, Orchestrator};
//!
//! let report = Orchestrator::new(IngestConfig::default())?.run()?;
//! println!("{} of {} documents saved", report.succeeded, report.total);
//! # Ok::<(), pdf_ingest::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod processing;
pub mod storage;
pub mod types;

pub use config::IngestConfig;
pub use error::{Error, ErrorKind, ExtractError, Result};
pub use pipeline::{Orchestrator, RunOutcome, RunReport};
pub use types::{BatchResult, DocumentPath, RawExtraction, ValidatedRecord};
