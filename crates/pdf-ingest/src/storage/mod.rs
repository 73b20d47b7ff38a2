//! Durable output

mod sink;

pub use sink::{JsonFileSink, OutputSink};
