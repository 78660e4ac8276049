use std::path::PathBuf;

pub mod backend;
pub mod config_file;
pub mod extractor;
pub mod mock;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend, PdfDocument};
pub use extractor::{ExtractError, extract_content};

/// Printed in place of a page's text when the page has none.
pub const NO_TEXT_SENTINEL: &str = "[No text found on this page]";

/// Separator line emitted after the document header and after every page.
pub const SEPARATOR: &str = "--------------------";

/// A reference from a page to an image object in the document's object table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Object number (xref) of the image stream.
    pub xref: u32,
    /// Resource name the page uses for the image (e.g. `Im0`), if known.
    pub name: Option<String>,
}

/// Encoded image bytes as reported by the PDF layer for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub xref: u32,
    /// Encoded payload; written to disk without modification.
    pub data: Vec<u8>,
    /// File extension implied by the payload's encoding (`png`, `jpeg`, ...).
    pub ext: String,
}

/// Output filename for an image found on the 0-based `page_index`.
///
/// Deterministic in (page, xref) so one run never collides, but a rerun
/// against the same directory overwrites earlier files.
pub fn image_filename(page_index: usize, xref: u32, ext: &str) -> String {
    format!("image_p{}_{}.{}", page_index + 1, xref, ext)
}

/// An image that could not be decoded or written.
#[derive(Debug, Clone)]
pub struct ImageFailure {
    /// 0-based page index.
    pub page_index: usize,
    pub xref: u32,
    /// Target path, when the failure happened while writing.
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Outcome of one extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub created_output_dir: bool,
    /// Set when the document could not be opened; nothing else ran.
    pub open_error: Option<String>,
    pub page_count: usize,
    /// Files written, in the order they were saved.
    pub saved: Vec<PathBuf>,
    pub failures: Vec<ImageFailure>,
    /// 0-based pages whose image references could not be listed.
    pub unlisted_pages: Vec<usize>,
}

impl ExtractionReport {
    pub fn image_count(&self) -> usize {
        self.saved.len()
    }

    pub fn opened(&self) -> bool {
        self.open_error.is_none()
    }
}

/// Events emitted while an extraction runs, in the order they happen.
///
/// Page numbers in events are 0-based indices; presentation layers add 1.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    OutputDirCreated {
        path: PathBuf,
    },
    OpenFailed {
        path: PathBuf,
        error: String,
    },
    Opened {
        path: PathBuf,
        page_count: usize,
    },
    TextPhaseStarted,
    /// Text of one page. `text` is `None` when the page has no visible text.
    PageText {
        index: usize,
        text: Option<String>,
    },
    PageTextFailed {
        index: usize,
        error: String,
    },
    ImagePhaseStarted,
    /// The page's image references could not be read; it contributes no images.
    ImageListFailed {
        index: usize,
        error: String,
    },
    ImageSaved {
        index: usize,
        xref: u32,
        path: PathBuf,
    },
    ImageDecodeFailed {
        index: usize,
        xref: u32,
        error: String,
    },
    ImageWriteFailed {
        index: usize,
        xref: u32,
        path: PathBuf,
        error: String,
    },
    Finished {
        image_count: usize,
        output_dir: PathBuf,
    },
}
