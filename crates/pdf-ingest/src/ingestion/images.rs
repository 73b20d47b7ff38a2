//! Embedded image extraction (side-pipeline, never fatal to text extraction)

use lopdf::Document;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::ExtractError;
use crate::types::DocumentPath;

/// Images handled for one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageCount {
    /// Files written to the output directory
    pub written: usize,
    /// Image streams found but not written
    pub skipped: usize,
}

/// Writes the images embedded in one document into a directory
pub trait ImageExtractor: Send + Sync {
    fn extract_images(&self, path: &Path, output_dir: &Path) -> Result<ImageCount, ExtractError>;
}

/// lopdf-backed image extractor.
///
/// Only streams that are complete image files as stored are written: a lone
/// DCTDecode filter becomes a `.jpg`, a lone JPXDecode filter a `.jp2`. Raw
/// or Flate-compressed samples, JBIG2 fragments and chained filters would
/// need decoding and re-encoding, so they are skipped and counted instead.
#[derive(Debug, Clone, Default)]
pub struct LopdfImageExtractor;

impl LopdfImageExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ImageExtractor for LopdfImageExtractor {
    fn extract_images(&self, path: &Path, output_dir: &Path) -> Result<ImageCount, ExtractError> {
        let data = std::fs::read(path)?;
        let doc = Document::load_mem(&data)
            .map_err(|e| ExtractError::Malformed(format!("failed to load PDF: {}", e)))?;

        let stem = DocumentPath::new(path).stem();
        let mut count = ImageCount::default();

        for (page_number, page_id) in doc.get_pages() {
            // Pages that inherit their resources, or have none, report an error here
            let images = match doc.get_page_images(page_id) {
                Ok(images) => images,
                Err(e) => {
                    tracing::debug!("No image resources on page {}: {}", page_number, e);
                    continue;
                }
            };

            for (index, image) in images.iter().enumerate() {
                let Some(extension) = image_extension(image.filters.as_deref()) else {
                    tracing::debug!(
                        "Skipping image {} on page {}: filters {:?} are not a standalone format",
                        index + 1,
                        page_number,
                        image.filters
                    );
                    count.skipped += 1;
                    continue;
                };

                std::fs::create_dir_all(output_dir)?;
                let target = output_dir.join(image_file_name(&stem, page_number, index + 1, extension));
                std::fs::write(&target, image.content)?;
                tracing::debug!("Image from page {} saved to {}", page_number, target.display());
                count.written += 1;
            }
        }

        Ok(count)
    }
}

/// `<stem>_image_<page>_<index>.<ext>`, page and index 1-based
pub fn image_file_name(stem: &str, page: u32, index: usize, extension: &str) -> String {
    format!("{}_image_{}_{}.{}", stem, page, index, extension)
}

/// File extension for an image stream that can be written as stored, given
/// its filter chain
pub fn image_extension(filters: Option<&[String]>) -> Option<&'static str> {
    match filters? {
        [only] if only == "DCTDecode" => Some("jpg"),
        [only] if only == "JPXDecode" => Some("jp2"),
        _ => None,
    }
}

/// Running totals for the image side-pipeline, shared by all workers
#[derive(Debug, Default)]
pub struct ImageStats {
    written: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl ImageStats {
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Image extraction bound to an output directory, run per document by the
/// reader workers
#[derive(Clone)]
pub struct ImageStage {
    extractor: Arc<dyn ImageExtractor>,
    output_dir: PathBuf,
    stats: Arc<ImageStats>,
}

impl ImageStage {
    pub fn new(extractor: Arc<dyn ImageExtractor>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            output_dir: output_dir.into(),
            stats: Arc::new(ImageStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ImageStats> {
        self.stats.clone()
    }

    /// Extract images for one document. Failures are logged and counted.
    pub fn run(&self, path: &DocumentPath) {
        match self.extractor.extract_images(path.as_path(), &self.output_dir) {
            Ok(ImageCount { written: 0, skipped: 0 }) => {
                tracing::info!("No images found in {}", path)
            }
            Ok(count) => {
                self.stats.written.fetch_add(count.written, Ordering::Relaxed);
                self.stats.skipped.fetch_add(count.skipped, Ordering::Relaxed);
                tracing::info!(
                    "Extracted {} image(s) from {}, skipped {}",
                    count.written,
                    path,
                    count.skipped
                );
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Error extracting images from {}: {}", path, e);
            }
        }
    }

    /// Count a document whose image extraction panicked
    pub(crate) fn record_failure(&self) {
        self.stats.failed.fetch_add(1, Ordering::Relaxed);
    }
}
