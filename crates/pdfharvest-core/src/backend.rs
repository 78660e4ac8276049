use std::path::Path;

use thiserror::Error;

use crate::{ExtractedImage, ImageRef};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("object table unavailable: {0}")]
    ObjectTable(String),
    #[error("failed to decode image {xref}: {message}")]
    ImageError { xref: u32, message: String },
    #[error("failed to write PDF: {0}")]
    WriteError(String),
    #[error("page {0} out of range")]
    PageOutOfRange(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF backends.
///
/// A backend only knows how to open a file; everything page-level goes
/// through the returned [`PdfDocument`]. The extraction pipeline
/// (ordering, naming, saving, reporting) lives in [`crate::extractor`].
pub trait PdfBackend: Send + Sync {
    /// Open a document read-only.
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError>;
}

/// An open, read-only PDF document.
///
/// Dropping the value releases the underlying handles.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Plain text of the page at the 0-based `index`.
    fn page_text(&self, index: usize) -> Result<String, BackendError>;

    /// Images the page references, with indirect references resolved to
    /// their image objects, in the order the page's resources list them.
    fn page_images(&self, index: usize) -> Result<Vec<ImageRef>, BackendError>;

    /// Encoded bytes and extension of the image object `xref`.
    fn extract_image(&self, xref: u32) -> Result<ExtractedImage, BackendError>;
}
