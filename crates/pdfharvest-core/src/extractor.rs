use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::backend::{PdfBackend, PdfDocument};
use crate::{ExtractionReport, ImageFailure, ProgressEvent, image_filename};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Extract the text and embedded images of a PDF.
///
/// Pipeline:
/// 1. Create `output_dir` (with parents) if it is missing
/// 2. Open the document; on failure report it and stop
/// 3. Text phase: every page in order, sentinel for empty pages
/// 4. Image phase: every image reference of every page, written verbatim
///    to `output_dir/image_p<page>_<xref>.<ext>`
///
/// Failures to open the document or to decode/write a single image are
/// reported through `progress` and recorded in the returned report; only a
/// failure to create the output directory is returned as `Err`.
pub fn extract_content(
    pdf_path: &Path,
    output_dir: &Path,
    backend: &dyn PdfBackend,
    progress: &dyn Fn(ProgressEvent),
) -> Result<ExtractionReport, ExtractError> {
    let mut report = ExtractionReport::default();

    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir).map_err(|source| ExtractError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
        report.created_output_dir = true;
        progress(ProgressEvent::OutputDirCreated {
            path: output_dir.to_path_buf(),
        });
    }

    let document = match backend.open(pdf_path) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!(path = %pdf_path.display(), error = %e, "open failed");
            report.open_error = Some(e.to_string());
            progress(ProgressEvent::OpenFailed {
                path: pdf_path.to_path_buf(),
                error: e.to_string(),
            });
            return Ok(report);
        }
    };

    report.page_count = document.page_count();
    tracing::debug!(path = %pdf_path.display(), pages = report.page_count, "opened document");
    progress(ProgressEvent::Opened {
        path: pdf_path.to_path_buf(),
        page_count: report.page_count,
    });

    emit_text(document.as_ref(), progress);
    save_images(document.as_ref(), output_dir, &mut report, progress);

    progress(ProgressEvent::Finished {
        image_count: report.image_count(),
        output_dir: output_dir.to_path_buf(),
    });

    Ok(report)
}

fn emit_text(document: &dyn PdfDocument, progress: &dyn Fn(ProgressEvent)) {
    progress(ProgressEvent::TextPhaseStarted);

    for index in 0..document.page_count() {
        match document.page_text(index) {
            Ok(text) => {
                let text = if text.trim().is_empty() {
                    None
                } else {
                    Some(text)
                };
                progress(ProgressEvent::PageText { index, text });
            }
            Err(e) => {
                tracing::warn!(page = index + 1, error = %e, "page text unavailable");
                progress(ProgressEvent::PageTextFailed {
                    index,
                    error: e.to_string(),
                });
            }
        }
    }
}

fn save_images(
    document: &dyn PdfDocument,
    output_dir: &Path,
    report: &mut ExtractionReport,
    progress: &dyn Fn(ProgressEvent),
) {
    progress(ProgressEvent::ImagePhaseStarted);

    for index in 0..document.page_count() {
        let refs = match document.page_images(index) {
            Ok(refs) => refs,
            Err(e) => {
                tracing::warn!(page = index + 1, error = %e, "could not list page images");
                report.unlisted_pages.push(index);
                progress(ProgressEvent::ImageListFailed {
                    index,
                    error: e.to_string(),
                });
                continue;
            }
        };
        tracing::debug!(page = index + 1, images = refs.len(), "listed page images");

        for image_ref in refs {
            let xref = image_ref.xref;
            let image = match document.extract_image(xref) {
                Ok(image) => image,
                Err(e) => {
                    report.failures.push(ImageFailure {
                        page_index: index,
                        xref,
                        path: None,
                        message: e.to_string(),
                    });
                    progress(ProgressEvent::ImageDecodeFailed {
                        index,
                        xref,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let path = output_dir.join(image_filename(index, xref, &image.ext));
            match write_image(&path, &image.data) {
                Ok(()) => {
                    tracing::trace!(xref, bytes = image.data.len(), path = %path.display(), "saved image");
                    report.saved.push(path.clone());
                    progress(ProgressEvent::ImageSaved { index, xref, path });
                }
                Err(e) => {
                    report.failures.push(ImageFailure {
                        page_index: index,
                        xref,
                        path: Some(path.clone()),
                        message: e.to_string(),
                    });
                    progress(ProgressEvent::ImageWriteFailed {
                        index,
                        xref,
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Create or truncate `path` and write `data` as-is. The handle is closed
/// when this returns, on success or error.
fn write_image(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)
}
