//! Recursive document discovery

use std::path::Path;
use tracing::Span;
use walkdir::WalkDir;

use crate::config::InputConfig;
use crate::error::{Error, Result};
use crate::types::DocumentPath;

/// Walks a directory tree and keeps files with matching extensions
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    extensions: Vec<String>,
    follow_links: bool,
    span: Span,
}

impl DirectoryWalker {
    pub fn new(extensions: &[String], follow_links: bool, span: Span) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            follow_links,
            span,
        }
    }

    pub fn from_config(config: &InputConfig, span: Span) -> Self {
        Self::new(&config.extensions, config.follow_links, span)
    }

    /// All matching files under `root`, sorted by path
    pub fn discover(&self, root: &Path) -> Result<Vec<DocumentPath>> {
        if !root.is_dir() {
            return Err(Error::discovery(root, "not a directory or does not exist"));
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(root).follow_links(self.follow_links) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(parent: &self.span, "Skipping unreadable entry under '{}': {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if self.matches(entry.path()) {
                found.push(DocumentPath::new(entry.into_path()));
            } else {
                tracing::debug!(parent: &self.span, "Ignoring non-matching file: {}", entry.path().display());
            }
        }

        found.sort();
        tracing::info!(parent: &self.span, "Found {} document(s) in '{}'", found.len(), root.display());
        Ok(found)
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| *wanted == ext))
    }
}
