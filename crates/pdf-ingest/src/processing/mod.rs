//! Concurrent reading, validation and aggregation

mod aggregator;
mod pool;
pub mod validator;

pub use aggregator::BatchAggregator;
pub use pool::{CompletionStream, ConcurrentIngestor};
pub use validator::{hash_content, ContentRule, ContentValidator, MinChars, Normalization, RequiredMarkers};
