//! Batch PDF ingestion
//!
//! Run with: cargo run -p pdf-ingest -- --input ./pdfs --output ./output

use clap::Parser;
use pdf_ingest::{IngestConfig, Orchestrator, RunOutcome, RunReport};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Extract text from every PDF under a directory into one JSON file
#[derive(Parser)]
#[command(name = "pdf-ingest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory searched recursively for documents
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory the JSON output is written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fixed output file name instead of a timestamped one
    #[arg(long)]
    output_file: Option<String>,

    /// Number of documents read in parallel
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Text that every accepted document must contain (repeatable)
    #[arg(long = "require", value_name = "MARKER")]
    required_markers: Vec<String>,

    /// Minimum number of characters after normalisation
    #[arg(long)]
    min_chars: Option<usize>,

    /// Replace non-ASCII characters with spaces
    #[arg(long)]
    ascii_only: bool,

    /// Keep whitespace runs as extracted
    #[arg(long)]
    no_collapse_whitespace: bool,

    /// Also extract embedded images
    #[arg(long)]
    images: bool,

    /// Directory for extracted images (default: <output>/images)
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Skip documents larger than this many bytes
    #[arg(long)]
    max_document_bytes: Option<u64>,

    /// Write compact instead of pretty-printed JSON
    #[arg(long)]
    compact: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<IngestConfig> {
        let mut config = match &self.config {
            Some(path) => IngestConfig::load(path)?,
            None => IngestConfig::default(),
        };

        if let Some(dir) = self.input {
            config.input.dir = dir;
        }
        if let Some(dir) = self.output {
            config.output.dir = dir;
        }
        if self.output_file.is_some() {
            config.output.file_name = self.output_file;
        }
        if self.compact {
            config.output.pretty = false;
        }
        if let Some(concurrency) = self.concurrency {
            config.processing.concurrency = concurrency;
        }
        if self.max_document_bytes.is_some() {
            config.processing.max_document_bytes = self.max_document_bytes;
        }
        if !self.required_markers.is_empty() {
            config.validation.required_markers = self.required_markers;
        }
        if let Some(min_chars) = self.min_chars {
            config.validation.min_chars = min_chars;
        }
        if self.ascii_only {
            config.validation.ascii_only = true;
        }
        if self.no_collapse_whitespace {
            config.validation.collapse_whitespace = false;
        }
        if self.images {
            config.images.enabled = true;
        }
        if self.images_dir.is_some() {
            config.images.dir = self.images_dir;
        }

        Ok(config)
    }
}

fn print_summary(report: &RunReport) {
    println!("Run {}", report.run_id);
    println!("  Documents:  {}", report.total);
    println!("  Succeeded:  {}", report.succeeded);
    println!("  Empty:      {}", report.skipped_empty);
    println!("  Rejected:   {}", report.rejected_invalid);
    println!("  Failed:     {}", report.failed_read);
    if report.images_written + report.images_skipped + report.images_failed > 0 {
        println!(
            "  Images:     {} written, {} skipped, {} failed",
            report.images_written, report.images_skipped, report.images_failed
        );
    }

    for error in &report.errors {
        println!("  - [{}] {}", error.label(), error);
    }

    match &report.outcome {
        RunOutcome::Persisted { path, records } => {
            println!("Saved {} record(s) to {}", records, path.display())
        }
        RunOutcome::NothingToPersist => println!("Nothing to persist"),
        RunOutcome::PersistFailed {
            error,
            unsaved_records,
        } => println!("Run failed: {} ({} record(s) not saved)", error, unsaved_records),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Cli::parse().into_config()?;
    tracing::info!("Input: {}", config.input.dir.display());
    tracing::info!("Output: {}", config.output.dir.display());
    tracing::info!("Concurrency: {}", config.processing.concurrency);

    let report = Orchestrator::new(config)?.run()?;
    print_summary(&report);
    report.into_result()?;

    Ok(())
}
