use std::path::Path;

use mupdf::{Document, TextPageFlags};

use pdfharvest_core::{BackendError, ExtractedImage, ImageRef, PdfBackend, PdfDocument};

pub mod images;
pub mod sample;

pub use sample::write_sample_pdf;

/// MuPDF-based implementation of [`PdfBackend`].
///
/// The mupdf dependency (AGPL-3.0) is confined to this crate so the chart
/// and core crates do not depend on it transitively.
///
/// Page text comes from MuPDF's structured text, iterated block by block
/// and line by line. Image references and image payloads come from the
/// document's object table, read with lopdf, because they are addressed by
/// object number.
///
/// MuPDF decides whether a file opens at all. It repairs damaged cross
/// reference tables that lopdf rejects; such a document still yields its
/// text, and every image request reports the lopdf failure instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for MupdfBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let text_doc =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;
        let page_count = text_doc
            .page_count()
            .map_err(|e| BackendError::OpenError(e.to_string()))?;

        let objects = match lopdf::Document::load(path) {
            Ok(object_doc) => {
                let page_ids: Vec<lopdf::ObjectId> =
                    object_doc.get_pages().into_values().collect();
                if page_ids.len() != page_count as usize {
                    tracing::debug!(
                        mupdf = page_count,
                        lopdf = page_ids.len(),
                        "page count mismatch between parsers"
                    );
                }
                Ok(ObjectTable {
                    doc: object_doc,
                    page_ids,
                })
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "object table unreadable, images unavailable"
                );
                Err(e.to_string())
            }
        };

        Ok(Box::new(MupdfDocument {
            text_doc,
            page_count: page_count.max(0) as usize,
            objects,
        }))
    }
}

/// A document opened by [`MupdfBackend`].
///
/// Both parsers only read the file; nothing is ever saved back.
pub struct MupdfDocument {
    text_doc: Document,
    page_count: usize,
    /// lopdf's view of the file, or why it could not be loaded.
    objects: Result<ObjectTable, String>,
}

struct ObjectTable {
    doc: lopdf::Document,
    /// Page object ids in document order.
    page_ids: Vec<lopdf::ObjectId>,
}

impl MupdfDocument {
    fn objects(&self) -> Result<&ObjectTable, BackendError> {
        self.objects
            .as_ref()
            .map_err(|e| BackendError::ObjectTable(e.clone()))
    }
}

impl PdfDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, index: usize) -> Result<String, BackendError> {
        if index >= self.page_count {
            return Err(BackendError::PageOutOfRange(index));
        }
        let page = self
            .text_doc
            .load_page(index as i32)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

        // Block/line iteration keeps reading order and line breaks per block
        let mut page_text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                page_text.push_str(&line_text);
                page_text.push('\n');
            }
        }
        Ok(page_text)
    }

    fn page_images(&self, index: usize) -> Result<Vec<ImageRef>, BackendError> {
        if index >= self.page_count {
            return Err(BackendError::PageOutOfRange(index));
        }
        let objects = self.objects()?;
        let page_id = objects
            .page_ids
            .get(index)
            .copied()
            .ok_or(BackendError::PageOutOfRange(index))?;
        images::page_image_refs(&objects.doc, page_id)
    }

    fn extract_image(&self, xref: u32) -> Result<ExtractedImage, BackendError> {
        images::extract_image(&self.objects()?.doc, xref)
    }
}
