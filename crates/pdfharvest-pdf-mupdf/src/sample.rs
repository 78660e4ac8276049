//! Demo document used when the source PDF is missing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use pdfharvest_core::BackendError;

/// Lines of the demo document, one slice per page.
pub const SAMPLE_PAGES: &[&[&str]] = &[
    &[
        "This is the first page with some sample text.",
        "PDF parsing is a common task in data processing.",
    ],
    &["This is the second page."],
];

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
/// First baseline: 72pt below the top edge, 50pt from the left.
const TEXT_LEFT: i64 = 50;
const TEXT_TOP: i64 = 72;
const LINE_GAP: i64 = 20;
const FONT_SIZE: i64 = 11;

/// Write a small text-only PDF with [`SAMPLE_PAGES`] to `path`.
pub fn write_sample_pdf(path: &Path) -> Result<(), BackendError> {
    let mut doc = sample_document()?;
    let mut writer = BufWriter::new(File::create(path)?);
    doc.save_to(&mut writer)
        .map_err(|e| BackendError::WriteError(e.to_string()))?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), pages = SAMPLE_PAGES.len(), "wrote sample PDF");
    Ok(())
}

fn sample_document() -> Result<Document, BackendError> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in SAMPLE_PAGES {
        let content = page_content(lines)
            .encode()
            .map_err(|e| BackendError::WriteError(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => SAMPLE_PAGES.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

fn page_content(lines: &[&str]) -> Content {
    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let baseline = PAGE_HEIGHT - TEXT_TOP - LINE_GAP * i as i64;
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("Td", vec![TEXT_LEFT.into(), baseline.into()]),
            Operation::new("Tj", vec![Object::string_literal(*line)]),
            Operation::new("ET", vec![]),
        ]);
    }
    Content { operations }
}
