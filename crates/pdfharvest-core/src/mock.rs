//! In-memory PDF backend for testing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::backend::{BackendError, PdfBackend, PdfDocument};
use crate::{ExtractedImage, ImageRef};

/// One page of a [`MockBackend`] document.
#[derive(Debug, Clone)]
pub struct MockPage {
    /// `Err` simulates a page whose text layer cannot be read.
    pub text: Result<String, String>,
    /// Image xrefs referenced by the page, in order. `Err` simulates a page
    /// whose resources cannot be read.
    pub images: Result<Vec<u32>, String>,
}

impl MockPage {
    pub fn text(text: &str) -> Self {
        Self {
            text: Ok(text.to_string()),
            images: Ok(Vec::new()),
        }
    }

    pub fn with_images(mut self, xrefs: &[u32]) -> Self {
        self.images = Ok(xrefs.to_vec());
        self
    }

    pub fn with_unreadable_images(mut self, message: &str) -> Self {
        self.images = Err(message.to_string());
        self
    }
}

/// A hand-rolled backend that serves a fixed document from memory.
///
/// Every `open` call returns a fresh view of the same pages and images.
/// `open_count` and `live_documents` let tests check that handles are
/// acquired and released.
#[derive(Default)]
pub struct MockBackend {
    pages: Vec<MockPage>,
    /// `Err` simulates an undecodable image.
    images: HashMap<u32, Result<ExtractedImage, String>>,
    open_error: Option<String>,
    open_count: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new(pages: Vec<MockPage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    /// A backend whose `open` always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            open_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, xref: u32, ext: &str, data: &[u8]) -> Self {
        self.images.insert(
            xref,
            Ok(ExtractedImage {
                xref,
                data: data.to_vec(),
                ext: ext.to_string(),
            }),
        );
        self
    }

    pub fn with_broken_image(mut self, xref: u32, message: &str) -> Self {
        self.images.insert(xref, Err(message.to_string()));
        self
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    /// Documents opened and not yet dropped.
    pub fn live_documents(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl PdfBackend for MockBackend {
    fn open(&self, _path: &Path) -> Result<Box<dyn PdfDocument>, BackendError> {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = self.open_error {
            return Err(BackendError::OpenError(message.clone()));
        }
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDocument {
            pages: self.pages.clone(),
            images: self.images.clone(),
            live: Arc::clone(&self.live),
        }))
    }
}

struct MockDocument {
    pages: Vec<MockPage>,
    images: HashMap<u32, Result<ExtractedImage, String>>,
    live: Arc<AtomicUsize>,
}

impl Drop for MockDocument {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PdfDocument for MockDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String, BackendError> {
        let page = self
            .pages
            .get(index)
            .ok_or(BackendError::PageOutOfRange(index))?;
        page.text.clone().map_err(BackendError::ExtractionError)
    }

    fn page_images(&self, index: usize) -> Result<Vec<ImageRef>, BackendError> {
        let page = self
            .pages
            .get(index)
            .ok_or(BackendError::PageOutOfRange(index))?;
        let xrefs = page.images.as_ref().map_err(|e| BackendError::ObjectTable(e.clone()))?;
        Ok(xrefs
            .iter()
            .map(|&xref| ImageRef { xref, name: None })
            .collect())
    }

    fn extract_image(&self, xref: u32) -> Result<ExtractedImage, BackendError> {
        match self.images.get(&xref) {
            Some(Ok(image)) => Ok(image.clone()),
            Some(Err(message)) => Err(BackendError::ImageError {
                xref,
                message: message.clone(),
            }),
            None => Err(BackendError::ImageError {
                xref,
                message: "no such object".into(),
            }),
        }
    }
}
