//! Shared fixtures for the integration tests

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_ingest::ingestion::ExtractedPages;
use pdf_ingest::{DocumentPath, ExtractError};
use std::path::Path;

/// Extractor whose behaviour is chosen by the file stem:
/// `fail-*` is malformed, `empty-*` has no text, `panic-*` panics,
/// anything else yields `Document <stem>`
pub fn scripted(path: &Path) -> Result<ExtractedPages, ExtractError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if stem.starts_with("fail-") {
        Err(ExtractError::Malformed("broken cross-reference table".into()))
    } else if stem.starts_with("empty-") {
        Ok(ExtractedPages::from_pages(vec!["  ".into(), "\n".into()]))
    } else if stem.starts_with("panic-") {
        panic!("extractor bug on {}", stem)
    } else {
        Ok(ExtractedPages::from_pages(vec![format!("Document {}", stem)]))
    }
}

pub fn paths(names: &[String]) -> Vec<DocumentPath> {
    names.iter().map(|name| DocumentPath::new(name.as_str())).collect()
}

/// A generated single-page document
#[derive(Default)]
pub struct SamplePdf<'a> {
    pub text: &'a str,
    /// /Info title; the author is then always "Records Office"
    pub title: Option<&'a str>,
    /// Stored as a DCTDecode image XObject on the page
    pub jpeg: Option<&'a [u8]>,
}

impl SamplePdf<'_> {
    pub fn write(&self, path: &Path) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut resources = dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        };
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(self.text)]),
            Operation::new("ET", vec![]),
        ];
        if let Some(jpeg) = self.jpeg {
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 1,
                    "Height" => 1,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                jpeg.to_vec(),
            ));
            resources.set("XObject", dictionary! { "Im1" => image_id });
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![100.into(), 0.into(), 0.into(), 100.into(), 72.into(), 500.into()],
                ),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ]);
        }
        // Resources sit on the page itself: image lookup does not inherit them
        let resources_id = doc.add_object(resources);

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if let Some(title) = self.title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title),
                "Author" => Object::string_literal("Records Office"),
            });
            doc.trailer.set("Info", info_id);
        }
        doc.save(path).unwrap();
    }
}

/// Single-page PDF with one line of Courier text
pub fn write_pdf(path: &Path, text: &str) {
    SamplePdf {
        text,
        ..Default::default()
    }
    .write(path);
}
