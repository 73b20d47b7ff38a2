//! Content normalisation and pluggable validation rules

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::config::ValidationConfig;
use crate::error::ErrorKind;
use crate::types::{DocumentPath, ValidatedRecord};

/// Structural check applied to normalised content.
/// Returns the rejection reason on failure.
pub trait ContentRule: Send + Sync {
    fn check(&self, content: &str) -> Result<(), String>;
}

impl<F> ContentRule for F
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    fn check(&self, content: &str) -> Result<(), String> {
        self(content)
    }
}

/// Minimum length in characters
#[derive(Debug, Clone, Copy)]
pub struct MinChars(pub usize);

impl ContentRule for MinChars {
    fn check(&self, content: &str) -> Result<(), String> {
        let chars = content.chars().count();
        if chars < self.0 {
            return Err(format!("content has {} chars, minimum is {}", chars, self.0));
        }
        Ok(())
    }
}

/// Every marker must appear somewhere in the content
#[derive(Debug, Clone)]
pub struct RequiredMarkers(pub Vec<String>);

impl ContentRule for RequiredMarkers {
    fn check(&self, content: &str) -> Result<(), String> {
        let missing: Vec<&str> = self
            .0
            .iter()
            .filter(|marker| !content.contains(marker.as_str()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing required marker(s): {}", missing.join(", ")))
        }
    }
}

/// Text clean-up applied before rules run. Idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalization {
    pub collapse_whitespace: bool,
    pub ascii_only: bool,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            collapse_whitespace: true,
            ascii_only: false,
        }
    }
}

impl Normalization {
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut in_non_ascii = false;
        let mut in_space = false;

        for ch in text.chars() {
            let ch = if self.ascii_only && !ch.is_ascii() {
                if in_non_ascii {
                    continue;
                }
                in_non_ascii = true;
                ' '
            } else {
                in_non_ascii = false;
                ch
            };

            if self.collapse_whitespace && ch.is_whitespace() {
                if !in_space {
                    out.push(' ');
                }
                in_space = true;
            } else {
                out.push(ch);
                in_space = false;
            }
        }

        out.trim().to_string()
    }
}

/// Normalises extracted text and applies the configured rules
#[derive(Clone, Default)]
pub struct ContentValidator {
    normalization: Normalization,
    rules: Vec<Arc<dyn ContentRule>>,
}

impl ContentValidator {
    pub fn new(normalization: Normalization) -> Self {
        Self {
            normalization,
            rules: Vec::new(),
        }
    }

    /// Validator with the rules described by `config`
    pub fn from_config(config: &ValidationConfig) -> Self {
        let mut validator = Self::new(Normalization {
            collapse_whitespace: config.collapse_whitespace,
            ascii_only: config.ascii_only,
        });
        if config.min_chars > 1 {
            validator = validator.with_rule(MinChars(config.min_chars));
        }
        if !config.required_markers.is_empty() {
            validator = validator.with_rule(RequiredMarkers(config.required_markers.clone()));
        }
        validator
    }

    pub fn with_rule(mut self, rule: impl ContentRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn with_shared_rule(mut self, rule: Arc<dyn ContentRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Accept or reject one document's text. Empty content is always rejected.
    pub fn validate(&self, path: &DocumentPath, text: &str) -> Result<ValidatedRecord, ErrorKind> {
        let content = self.normalization.apply(text);
        if content.is_empty() {
            return Err(ErrorKind::ValidationFailure {
                path: path.clone(),
                reason: "content is empty".to_string(),
            });
        }

        for rule in &self.rules {
            rule.check(&content).map_err(|reason| ErrorKind::ValidationFailure {
                path: path.clone(),
                reason,
            })?;
        }

        Ok(ValidatedRecord {
            file_name: path.file_name(),
            content_hash: hash_content(&content),
            content,
            extracted_at: Utc::now(),
            page_count: None,
            metadata: None,
        })
    }
}

/// Hash content for deduplication
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_collapses_and_trims() {
        let norm = Normalization::default();
        assert_eq!(norm.apply("  Hello \n\n  world\t! "), "Hello world !");
    }

    #[test]
    fn test_ascii_only_replaces_runs() {
        let norm = Normalization {
            collapse_whitespace: false,
            ascii_only: true,
        };
        assert_eq!(norm.apply("caf\u{e9}\u{e9} ok"), "caf  ok");
    }

    #[test]
    fn test_validation_is_idempotent() {
        let validator = ContentValidator::new(Normalization {
            collapse_whitespace: true,
            ascii_only: true,
        });
        let path = DocumentPath::new("a.pdf");

        let first = validator.validate(&path, "  Na\u{ef}ve   text \u{2014} here\n").unwrap();
        let second = validator.validate(&path, &first.content).unwrap();
        assert_eq!(first.content, second.content);
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[test]
    fn test_empty_rejected() {
        let validator = ContentValidator::default();
        let err = validator.validate(&"e.pdf".into(), " \n\t ").unwrap_err();
        assert!(matches!(err, ErrorKind::ValidationFailure { .. }));
    }

    #[test]
    fn test_required_markers() {
        let validator = ContentValidator::default()
            .with_rule(RequiredMarkers(vec!["Invoice".into(), "Total".into()]));
        let path = DocumentPath::new("inv.pdf");

        assert!(validator.validate(&path, "Invoice 42 Total: 10").is_ok());
        match validator.validate(&path, "Invoice 42") {
            Err(ErrorKind::ValidationFailure { reason, .. }) => assert!(reason.contains("Total")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_closure_rule() {
        let validator = ContentValidator::default().with_rule(|content: &str| {
            if content.starts_with("DRAFT") {
                Err("draft documents are not ingested".to_string())
            } else {
                Ok(())
            }
        });

        assert!(validator.validate(&"a.pdf".into(), "DRAFT notes").is_err());
        assert!(validator.validate(&"b.pdf".into(), "Final notes").is_ok());
    }

    #[test]
    fn test_from_config() {
        let config = ValidationConfig {
            required_markers: vec!["Report".into()],
            min_chars: 10,
            ..Default::default()
        };
        let validator = ContentValidator::from_config(&config);
        let path = DocumentPath::new("r.pdf");

        assert!(validator.validate(&path, "Report").is_err());
        assert!(validator.validate(&path, "Annual Report 2024").is_ok());
        assert!(validator.validate(&path, "Annual summary 2024").is_err());
    }

    #[test]
    fn test_record_fields() {
        let record = ContentValidator::default()
            .validate(&"/data/in/hello.pdf".into(), "  Hello world ")
            .unwrap();
        assert_eq!(record.file_name, "hello.pdf");
        assert_eq!(record.content, "Hello world");
        assert_eq!(record.content_hash.len(), 64);
    }
}
