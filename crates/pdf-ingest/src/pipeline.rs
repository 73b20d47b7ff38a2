//! One batch run, end to end
//!
//! discover -> read (worker pool) -> validate and aggregate -> persist

use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Span;
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::ingestion::{
    DirectoryWalker, DocumentReader, ImageExtractor, ImageStage, LopdfExtractor,
    LopdfImageExtractor, PageExtractor,
};
use crate::processing::{BatchAggregator, ConcurrentIngestor, ContentRule, ContentValidator};
use crate::storage::{JsonFileSink, OutputSink};
use crate::types::{BatchResult, DocumentPath};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Records written to `path`
    Persisted { path: PathBuf, records: usize },
    /// No document produced a valid record; the sink was not called
    NothingToPersist,
    /// Extraction finished but the final write failed
    PersistFailed {
        error: ErrorKind,
        unsaved_records: usize,
    },
}

/// Summary of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub total: usize,
    pub succeeded: usize,
    pub skipped_empty: usize,
    pub rejected_invalid: usize,
    pub failed_read: usize,
    /// Every per-item failure, plus the persistence failure if any
    pub errors: Vec<ErrorKind>,
    pub images_written: usize,
    /// Image streams that are not standalone files and were not written
    pub images_skipped: usize,
    pub images_failed: usize,
    pub outcome: RunOutcome,
}

impl RunReport {
    fn from_batch(run_id: Uuid, batch: &BatchResult, outcome: RunOutcome) -> Self {
        Self {
            run_id,
            total: batch.total(),
            succeeded: batch.succeeded,
            skipped_empty: batch.skipped_empty,
            rejected_invalid: batch.rejected_invalid,
            failed_read: batch.failed_read,
            errors: batch.errors.clone(),
            images_written: 0,
            images_skipped: 0,
            images_failed: 0,
            outcome,
        }
    }

    /// False only when the final write failed
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, RunOutcome::PersistFailed { .. })
    }

    /// Treat a failed write as a hard error
    pub fn into_result(self) -> Result<Self> {
        match &self.outcome {
            RunOutcome::PersistFailed { error, .. } => Err(match error {
                ErrorKind::PersistenceFailure { target, cause } => Error::Persistence {
                    target: target.clone(),
                    cause: cause.clone(),
                },
                other => Error::persistence(PathBuf::new(), other),
            }),
            _ => Ok(self),
        }
    }
}

/// Runs one ingestion batch per call to [`Orchestrator::run`]
pub struct Orchestrator {
    config: IngestConfig,
    extractor: Arc<dyn PageExtractor>,
    image_extractor: Arc<dyn ImageExtractor>,
    sink: Option<Arc<dyn OutputSink>>,
    rules: Vec<Arc<dyn ContentRule>>,
}

impl Orchestrator {
    /// Validate `config` and set up the default lopdf readers and JSON sink
    pub fn new(config: IngestConfig) -> Result<Self> {
        config.validate()?;
        let extractor =
            LopdfExtractor::new().with_max_document_bytes(config.processing.max_document_bytes);
        Ok(Self {
            config,
            extractor: Arc::new(extractor),
            image_extractor: Arc::new(LopdfImageExtractor::new()),
            sink: None,
            rules: Vec::new(),
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_image_extractor(mut self, extractor: Arc<dyn ImageExtractor>) -> Self {
        self.image_extractor = extractor;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Add a content rule on top of the configured ones
    pub fn with_rule(mut self, rule: impl ContentRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Discover documents under the configured input directory and process them
    pub fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("batch", run_id = %run_id);

        let walker = DirectoryWalker::from_config(&self.config.input, span.clone());
        let paths = walker.discover(&self.config.input.dir)?;
        self.execute(run_id, span, paths)
    }

    /// Process an explicit list of documents
    pub fn run_paths(&self, paths: Vec<DocumentPath>) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("batch", run_id = %run_id);
        self.execute(run_id, span, paths)
    }

    fn execute(&self, run_id: Uuid, span: Span, paths: Vec<DocumentPath>) -> Result<RunReport> {
        tracing::info!(parent: &span, "Starting batch of {} document(s)", paths.len());

        if paths.is_empty() {
            tracing::info!(parent: &span, "Nothing to persist");
            return Ok(RunReport::from_batch(
                run_id,
                &BatchResult::new(),
                RunOutcome::NothingToPersist,
            ));
        }

        let reader = DocumentReader::new(self.extractor.clone(), span.clone());
        let mut ingestor =
            ConcurrentIngestor::new(reader, self.config.processing.concurrency, span.clone())?;

        let images = self.config.images.enabled.then(|| {
            let dir = self.config.images.dir_or(&self.config.output.dir);
            tracing::info!(parent: &span, "Extracting images to {}", dir.display());
            ImageStage::new(self.image_extractor.clone(), dir)
        });
        if let Some(stage) = &images {
            ingestor = ingestor.with_images(stage.clone());
        }

        let aggregator = BatchAggregator::new(self.validator(), span.clone());
        let mut batch = aggregator.aggregate(ingestor.spawn(paths)?);

        let outcome = if batch.has_records() {
            self.persist(&span, &mut batch)
        } else {
            tracing::info!(parent: &span, "Nothing to persist");
            RunOutcome::NothingToPersist
        };

        let mut report = RunReport::from_batch(run_id, &batch, outcome);
        if let Some(stage) = &images {
            let stats = stage.stats();
            report.images_written = stats.written();
            report.images_skipped = stats.skipped();
            report.images_failed = stats.failed();
            tracing::info!(
                parent: &span,
                "Images: {} written, {} skipped, {} failed",
                report.images_written,
                report.images_skipped,
                report.images_failed
            );
        }

        tracing::info!(
            parent: &span,
            "Batch finished: {} succeeded, {} empty, {} rejected, {} failed of {}",
            report.succeeded,
            report.skipped_empty,
            report.rejected_invalid,
            report.failed_read,
            report.total
        );
        Ok(report)
    }

    fn validator(&self) -> ContentValidator {
        self.rules.iter().fold(
            ContentValidator::from_config(&self.config.validation),
            |validator, rule| validator.with_shared_rule(rule.clone()),
        )
    }

    fn persist(&self, span: &Span, batch: &mut BatchResult) -> RunOutcome {
        let destination = &self.config.output.dir;
        let result = match &self.sink {
            Some(sink) => sink.persist(&batch.records, destination),
            None => {
                let file_name = self.config.output.file_name_at(Utc::now());
                JsonFileSink::new(file_name, self.config.output.pretty, span.clone())
                    .persist(&batch.records, destination)
            }
        };

        match result {
            Ok(path) => RunOutcome::Persisted {
                path,
                records: batch.records.len(),
            },
            Err(e) => {
                let error = e.kind().unwrap_or_else(|| ErrorKind::PersistenceFailure {
                    target: destination.clone(),
                    cause: e.to_string(),
                });
                tracing::error!(
                    parent: span,
                    "{}; {} extracted record(s) were not saved",
                    error,
                    batch.records.len()
                );
                batch.errors.push(error.clone());
                RunOutcome::PersistFailed {
                    error,
                    unsaved_records: batch.records.len(),
                }
            }
        }
    }
}
