//! Document reading: discovery, page extraction and image side-pipeline

mod discovery;
pub mod extractor;
pub mod images;
mod reader;

pub use discovery::DirectoryWalker;
pub use extractor::{ExtractedPages, LopdfExtractor, PageExtractor};
pub use images::{ImageCount, ImageExtractor, ImageStage, ImageStats, LopdfImageExtractor};
pub use reader::{join_pages, DocumentReader};
pub(crate) use reader::classify_panic;
