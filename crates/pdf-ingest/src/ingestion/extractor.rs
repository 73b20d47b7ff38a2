//! Page-level text extraction behind a swappable capability

use lopdf::{Dictionary, Document, Object};
use std::path::Path;

use crate::error::ExtractError;
use crate::types::DocumentMetadata;

/// Raw page texts of one document, in page order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPages {
    /// Text fragments in document order (one per page for the lopdf path)
    pub pages: Vec<String>,
    /// Number of pages in the document
    pub page_count: usize,
    /// Information dictionary entries
    pub metadata: DocumentMetadata,
}

impl ExtractedPages {
    /// One fragment per page
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self {
            page_count: pages.len(),
            pages,
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Extracts page texts from a document path, classifying failures.
///
/// Implementations are shared across reader workers and must not hold
/// per-document mutable state.
pub trait PageExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<ExtractedPages, ExtractError>;
}

impl<F> PageExtractor for F
where
    F: Fn(&Path) -> Result<ExtractedPages, ExtractError> + Send + Sync,
{
    fn extract_pages(&self, path: &Path) -> Result<ExtractedPages, ExtractError> {
        self(path)
    }
}

/// PDF extractor built on lopdf, with pdf-extract as a whole-document
/// fallback when no page yields through lopdf
#[derive(Debug, Clone, Default)]
pub struct LopdfExtractor {
    max_document_bytes: Option<u64>,
}

impl LopdfExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse documents larger than `limit` bytes before loading them
    pub fn with_max_document_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_document_bytes = limit;
        self
    }

    fn check_size(&self, path: &Path) -> Result<(), ExtractError> {
        if let Some(limit) = self.max_document_bytes {
            let size = std::fs::metadata(path)?.len();
            if size > limit {
                return Err(ExtractError::ResourceExhausted(format!(
                    "document is {} bytes, limit is {} bytes",
                    size, limit
                )));
            }
        }
        Ok(())
    }

    /// Fallback text extraction for documents lopdf cannot decode page by page
    fn extract_fallback(data: &[u8]) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(data)
            .map_err(|e| ExtractError::Malformed(format!("pdf-extract fallback failed: {}", e)))
    }
}

impl PageExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<ExtractedPages, ExtractError> {
        self.check_size(path)?;

        let data = std::fs::read(path)?;
        let doc = Document::load_mem(&data)
            .map_err(|e| ExtractError::Malformed(format!("failed to load PDF: {}", e)))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let mut pages = Vec::with_capacity(page_numbers.len());
        let mut failed_pages = 0usize;

        for page_number in &page_numbers {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    tracing::debug!(
                        "Could not extract text from page {} of '{}': {}",
                        page_number,
                        path.display(),
                        e
                    );
                    failed_pages += 1;
                    pages.push(String::new());
                }
            }
        }

        let metadata = read_metadata(&doc);

        if !page_numbers.is_empty() && failed_pages == page_numbers.len() {
            tracing::warn!(
                "lopdf could not decode any page of '{}', trying pdf-extract",
                path.display()
            );
            let text = Self::extract_fallback(&data)?;
            return Ok(ExtractedPages {
                pages: vec![text],
                page_count: page_numbers.len(),
                metadata,
            });
        }

        Ok(ExtractedPages::from_pages(pages).with_metadata(metadata))
    }
}

/// Title, author and creation date from the trailer's /Info dictionary
pub fn read_metadata(doc: &Document) -> DocumentMetadata {
    let info = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };

    match info {
        Some(info) => DocumentMetadata {
            title: info_string(doc, info, b"Title"),
            author: info_string(doc, info, b"Author"),
            creation_date: info_string(doc, info, b"CreationDate"),
        },
        None => DocumentMetadata::default(),
    }
}

fn info_string(doc: &Document, info: &Dictionary, key: &[u8]) -> Option<String> {
    let object = match info.get(key).ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        object => object,
    };
    match object {
        Object::String(bytes, _) => {
            let value = decode_text_string(bytes);
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        _ => None,
    }
}

/// PDF text strings are UTF-16BE when they carry a byte-order mark,
/// otherwise treated as UTF-8/PDFDocEncoding
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = LopdfExtractor::new().extract_pages(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }

    #[test]
    fn test_missing_file_is_io() {
        let err = LopdfExtractor::new()
            .extract_pages(Path::new("/definitely/not/here.pdf"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }

    #[test]
    fn test_size_limit_is_resource_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        std::fs::write(&path, vec![b'x'; 2048]).unwrap();

        let err = LopdfExtractor::new()
            .with_max_document_bytes(Some(1024))
            .extract_pages(&path)
            .unwrap_err();
        assert!(matches!(err, ExtractError::ResourceExhausted(_)));
    }

    #[test]
    fn test_decode_utf16_text_string() {
        let bytes = [0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(decode_text_string(&bytes), "Hi");
        assert_eq!(decode_text_string(b"plain"), "plain");
    }
}
