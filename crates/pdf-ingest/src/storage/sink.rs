//! JSON output with atomic replacement

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::Span;

use crate::error::{Error, Result};
use crate::types::ValidatedRecord;

/// Destination for a batch's records
pub trait OutputSink: Send + Sync {
    /// Write `records` under the `destination` directory and return the file
    /// written. Failures are [`Error::Persistence`] and are not retried.
    fn persist(&self, records: &[ValidatedRecord], destination: &Path) -> Result<PathBuf>;
}

/// Writes all records as one JSON array.
///
/// The document is written to a temporary file in the destination directory,
/// synced, then renamed over the target, so readers see either the previous
/// file or the complete new one.
pub struct JsonFileSink {
    file_name: String,
    pretty: bool,
    span: Span,
}

impl JsonFileSink {
    pub fn new(file_name: impl Into<String>, pretty: bool, span: Span) -> Self {
        Self {
            file_name: file_name.into(),
            pretty,
            span,
        }
    }

    fn encode(&self, records: &[ValidatedRecord]) -> serde_json::Result<Vec<u8>> {
        if self.pretty {
            serde_json::to_vec_pretty(records)
        } else {
            serde_json::to_vec(records)
        }
    }
}

impl OutputSink for JsonFileSink {
    fn persist(&self, records: &[ValidatedRecord], destination: &Path) -> Result<PathBuf> {
        let target = destination.join(&self.file_name);
        let fail = |cause: &dyn std::fmt::Display| {
            tracing::error!(parent: &self.span, "Failed to write {}: {}", target.display(), cause);
            Error::persistence(&target, cause)
        };

        std::fs::create_dir_all(destination).map_err(|e| fail(&e))?;
        let payload = self.encode(records).map_err(|e| fail(&e))?;

        let mut temp = NamedTempFile::new_in(destination).map_err(|e| fail(&e))?;
        temp.write_all(&payload).map_err(|e| fail(&e))?;
        temp.flush().map_err(|e| fail(&e))?;
        temp.as_file().sync_all().map_err(|e| fail(&e))?;
        temp.persist(&target).map_err(|e| fail(&e.error))?;

        tracing::info!(
            parent: &self.span,
            "Saved {} record(s) to {}",
            records.len(),
            target.display()
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(name: &str, content: &str) -> ValidatedRecord {
        ValidatedRecord {
            file_name: name.into(),
            content: content.into(),
            extracted_at: Utc::now(),
            content_hash: crate::processing::hash_content(content),
            page_count: Some(1),
            metadata: None,
        }
    }

    fn sink() -> JsonFileSink {
        JsonFileSink::new("out.json", true, Span::none())
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name != "out.json")
            .collect()
    }

    #[test]
    fn test_writes_json_array_and_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("nested/output");

        let written = sink()
            .persist(&[record("a.pdf", "Hello world")], &destination)
            .unwrap();

        assert_eq!(written, destination.join("out.json"));
        let parsed: Vec<ValidatedRecord> =
            serde_json::from_slice(&std::fs::read(&written).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].content, "Hello world");
        assert!(leftovers(&destination).is_empty());
    }

    #[test]
    fn test_overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new("out.json", false, Span::none());

        sink.persist(&[record("a.pdf", "one"), record("b.pdf", "two")], dir.path())
            .unwrap();
        let written = sink.persist(&[record("c.pdf", "three")], dir.path()).unwrap();

        let parsed: Vec<ValidatedRecord> =
            serde_json::from_slice(&std::fs::read(written).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].file_name, "c.pdf");
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the target path makes the final rename fail
        std::fs::create_dir(dir.path().join("out.json")).unwrap();
        std::fs::write(dir.path().join("out.json/keep"), b"x").unwrap();

        let err = sink().persist(&[record("a.pdf", "Hello")], dir.path()).unwrap_err();

        assert!(matches!(err, Error::Persistence { .. }));
        assert!(leftovers(dir.path()).is_empty());
        assert!(dir.path().join("out.json/keep").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_failure_keeps_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("out.json");
        std::fs::write(&existing, b"[]").unwrap();

        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o555)).unwrap();
        // Privileged users can still write; nothing to check then
        let writable = std::fs::write(dir.path().join(".write-check"), b"").is_ok();
        if !writable {
            let err = sink().persist(&[record("a.pdf", "Hello")], dir.path()).unwrap_err();
            assert!(matches!(err, Error::Persistence { .. }));
            assert_eq!(std::fs::read(&existing).unwrap(), b"[]");
        }

        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
