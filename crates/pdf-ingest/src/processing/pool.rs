//! Bounded reader pool with an unordered completion stream
//!
//! A fixed set of OS threads pulls document paths from a shared job queue and
//! pushes one [`RawExtraction`] per path onto a completion channel. Results
//! arrive in completion order, not submission order; consumers correlate by
//! `RawExtraction::path`. A failing or panicking document only affects its own
//! result. There is no per-document timeout: a hung parser holds its worker
//! and the stream does not end until that worker finishes.

use crossbeam::channel::{self, Receiver};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use tracing::Span;

use crate::error::{Error, Result};
use crate::ingestion::{classify_panic, DocumentReader, ImageStage};
use crate::types::{DocumentPath, RawExtraction};

/// Fans a batch of paths out to a fixed number of reader workers
pub struct ConcurrentIngestor {
    reader: DocumentReader,
    concurrency: usize,
    images: Option<ImageStage>,
    span: Span,
}

impl ConcurrentIngestor {
    /// Create an ingestor with `concurrency` workers. Zero is a configuration
    /// error.
    pub fn new(reader: DocumentReader, concurrency: usize, span: Span) -> Result<Self> {
        if concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        Ok(Self {
            reader,
            concurrency,
            images: None,
            span,
        })
    }

    /// Run image extraction for every document, in the worker that read it
    pub fn with_images(mut self, stage: ImageStage) -> Self {
        self.images = Some(stage);
        self
    }

    /// Start reading `paths` and return the completion stream.
    ///
    /// The stream yields exactly one result per submitted path. Fails only if
    /// no worker thread could be started at all.
    pub fn spawn(&self, paths: Vec<DocumentPath>) -> Result<CompletionStream> {
        let total = paths.len();
        let (result_tx, result_rx) = channel::unbounded();

        if total == 0 {
            return Ok(CompletionStream::new(result_rx, Vec::new(), 0, self.span.clone()));
        }

        let (job_tx, job_rx) = channel::unbounded::<DocumentPath>();
        for path in paths {
            // Receiver is alive in this scope, send cannot fail
            let _ = job_tx.send(path);
        }
        drop(job_tx);

        let worker_count = self.concurrency.min(total);
        let mut workers = Vec::with_capacity(worker_count);

        for id in 0..worker_count {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let reader = self.reader.clone();
            let images = self.images.clone();
            let span = self.span.clone();

            let spawned = thread::Builder::new()
                .name(format!("pdf-ingest-worker-{}", id))
                .spawn(move || {
                    span.in_scope(|| {
                        for path in jobs.iter() {
                            let extraction = process_one(&reader, images.as_ref(), &path);
                            if results.send(extraction).is_err() {
                                // Consumer went away; nothing left to deliver to
                                break;
                            }
                        }
                    })
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::warn!(
                    parent: &self.span,
                    "Could not start reader worker {}: {}",
                    id,
                    e
                ),
            }
        }

        if workers.is_empty() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no reader worker could be started",
            )));
        }

        tracing::info!(
            parent: &self.span,
            "Reading {} document(s) with {} worker(s)",
            total,
            workers.len()
        );

        Ok(CompletionStream::new(result_rx, workers, total, self.span.clone()))
    }

    /// Read every path and return once all results are in (completion order)
    pub fn ingest_all(&self, paths: Vec<DocumentPath>) -> Result<Vec<RawExtraction>> {
        Ok(self.spawn(paths)?.collect())
    }
}

/// Read one document and run the image stage; never panics
fn process_one(
    reader: &DocumentReader,
    images: Option<&ImageStage>,
    path: &DocumentPath,
) -> RawExtraction {
    let extraction = match panic::catch_unwind(AssertUnwindSafe(|| reader.read(path))) {
        Ok(extraction) => extraction,
        Err(payload) => RawExtraction::failed(path.clone(), classify_panic(path, payload.as_ref())),
    };

    if let Some(stage) = images {
        if panic::catch_unwind(AssertUnwindSafe(|| stage.run(path))).is_err() {
            stage.record_failure();
            tracing::warn!("Image extraction panicked for {}", path);
        }
    }

    extraction
}

/// Results of one batch in completion order.
///
/// Iteration ends once every worker has finished and all results have been
/// delivered; the workers are joined at that point. Dropping the stream early
/// stops delivery and still joins the workers.
pub struct CompletionStream {
    receiver: Receiver<RawExtraction>,
    workers: Vec<JoinHandle<()>>,
    expected: usize,
    delivered: usize,
    span: Span,
}

impl CompletionStream {
    fn new(
        receiver: Receiver<RawExtraction>,
        workers: Vec<JoinHandle<()>>,
        expected: usize,
        span: Span,
    ) -> Self {
        Self {
            receiver,
            workers,
            expected,
            delivered: 0,
            span,
        }
    }

    fn join_workers(&mut self) {
        for handle in std::mem::take(&mut self.workers) {
            if handle.join().is_err() {
                tracing::error!(parent: &self.span, "Reader worker terminated abnormally");
            }
        }
    }
}

impl Iterator for CompletionStream {
    type Item = RawExtraction;

    fn next(&mut self) -> Option<Self::Item> {
        match self.receiver.recv() {
            Ok(extraction) => {
                self.delivered += 1;
                Some(extraction)
            }
            Err(_) => {
                if !self.workers.is_empty() {
                    self.join_workers();
                    if self.delivered != self.expected {
                        tracing::error!(
                            parent: &self.span,
                            "Pool drained with {} of {} results",
                            self.delivered,
                            self.expected
                        );
                    } else {
                        tracing::info!(parent: &self.span, "All {} document(s) read", self.delivered);
                    }
                }
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.expected.saturating_sub(self.delivered);
        (0, Some(remaining))
    }
}

impl Drop for CompletionStream {
    fn drop(&mut self) {
        // Disconnect first so blocked senders give up, then wait for workers
        self.receiver = channel::never();
        self.join_workers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ExtractError};
    use crate::ingestion::ExtractedPages;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    fn paths(n: usize) -> Vec<DocumentPath> {
        (0..n).map(|i| DocumentPath::new(format!("doc-{:03}.pdf", i))).collect()
    }

    fn ingestor<F>(f: F, concurrency: usize) -> ConcurrentIngestor
    where
        F: Fn(&Path) -> std::result::Result<ExtractedPages, ExtractError> + Send + Sync + 'static,
    {
        let reader = DocumentReader::new(Arc::new(f), Span::none());
        ConcurrentIngestor::new(reader, concurrency, Span::none()).unwrap()
    }

    fn echo(path: &Path) -> std::result::Result<ExtractedPages, ExtractError> {
        Ok(ExtractedPages::from_pages(vec![path.display().to_string()]))
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let reader = DocumentReader::new(Arc::new(echo), Span::none());
        let result = ConcurrentIngestor::new(reader, 0, Span::none());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_batch_returns_immediately() {
        let results = ingestor(echo, 4).ingest_all(Vec::new()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_cardinality_across_concurrency_settings() {
        for concurrency in [1, 4, 10, 32] {
            let input = paths(10);
            let results = ingestor(echo, concurrency).ingest_all(input.clone()).unwrap();

            assert_eq!(results.len(), input.len());
            let seen: HashSet<_> = results.iter().map(|r| r.path.clone()).collect();
            let expected: HashSet<_> = input.into_iter().collect();
            assert_eq!(seen, expected, "concurrency {}", concurrency);
            for raw in &results {
                assert_eq!(raw.extracted_text(), Some(raw.path.to_string().as_str()));
            }
        }
    }

    #[test]
    fn test_failures_and_panics_are_isolated() {
        let ingestor = ingestor(
            |path: &Path| {
                let name = path.display().to_string();
                if name.ends_with("003.pdf") {
                    Err(ExtractError::Malformed("truncated trailer".into()))
                } else if name.ends_with("007.pdf") {
                    panic!("decoder bug")
                } else {
                    Ok(ExtractedPages::from_pages(vec![name]))
                }
            },
            3,
        );

        let results = ingestor.ingest_all(paths(12)).unwrap();
        assert_eq!(results.len(), 12);

        let failed: Vec<_> = results.iter().filter(|r| !r.is_ok()).collect();
        assert_eq!(failed.len(), 2);
        assert!(results
            .iter()
            .filter(|r| r.path.to_string().ends_with("007.pdf"))
            .all(|r| matches!(r.error(), Some(ErrorKind::Unclassified { .. }))));
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 10);
    }

    #[test]
    fn test_slow_document_does_not_hold_back_others() {
        let ingestor = ingestor(
            |path: &Path| {
                if path.display().to_string().ends_with("000.pdf") {
                    std::thread::sleep(Duration::from_millis(300));
                }
                Ok(ExtractedPages::from_pages(vec!["x".to_string()]))
            },
            2,
        );

        let mut stream = ingestor.spawn(paths(6)).unwrap();
        let first = stream.next().unwrap();
        assert_ne!(first.path.to_string(), "doc-000.pdf");

        let rest: Vec<_> = stream.collect();
        assert_eq!(rest.len(), 5);
        assert_eq!(rest.last().unwrap().path.to_string(), "doc-000.pdf");
    }

    #[test]
    fn test_dropping_stream_early_joins_workers() {
        let ingestor = ingestor(echo, 2);
        let mut stream = ingestor.spawn(paths(50)).unwrap();
        assert!(stream.next().is_some());
        drop(stream);
    }

    #[test]
    fn test_drained_stream_joins_workers_once() {
        let ingestor = ingestor(echo, 3);
        let mut stream = ingestor.spawn(paths(7)).unwrap();

        let mut seen = 0;
        while stream.next().is_some() {
            seen += 1;
        }
        assert_eq!(seen, 7);
        assert!(stream.workers.is_empty());
        assert!(stream.next().is_none());
        assert_eq!(stream.size_hint(), (0, Some(0)));
    }
}
