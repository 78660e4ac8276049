use std::cell::RefCell;
use std::io::Write;
use std::path::Path;

use pdfharvest_core::{ExtractionReport, PdfBackend, extract_content};

use crate::output::{self, ColorMode};

/// Run an extraction and print its progress to `writer`.
///
/// An unopenable document is reported and still returns `Ok`; only
/// output-directory and console write errors are returned.
pub fn run_extraction(
    pdf_path: &Path,
    output_dir: &Path,
    backend: &dyn PdfBackend,
    writer: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<ExtractionReport> {
    let writer = RefCell::new(writer);
    let write_error: RefCell<Option<std::io::Error>> = RefCell::new(None);

    let report = extract_content(pdf_path, output_dir, backend, &|event| {
        if write_error.borrow().is_some() {
            return;
        }
        let mut w = writer.borrow_mut();
        if let Err(e) = output::print_event(&mut **w, &event, color) {
            *write_error.borrow_mut() = Some(e);
        }
    })?;

    if let Some(e) = write_error.into_inner() {
        return Err(e.into());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use pdfharvest_core::mock::{MockBackend, MockPage};

    use super::*;

    fn run(backend: &MockBackend, out: &Path) -> (ExtractionReport, String) {
        let mut buf = Vec::new();
        let report =
            run_extraction(Path::new("doc.pdf"), out, backend, &mut buf, ColorMode(false)).unwrap();
        (report, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn one_header_per_page_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = MockBackend::new(vec![
            MockPage::text("alpha"),
            MockPage::text(""),
            MockPage::text("gamma"),
        ]);
        let (_, out) = run(&backend, tmp.path());

        let headers: Vec<&str> = out
            .lines()
            .filter(|l| l.starts_with("--- Text from Page"))
            .collect();
        assert_eq!(
            headers,
            vec![
                "--- Text from Page 1 ---",
                "--- Text from Page 2 ---",
                "--- Text from Page 3 ---",
            ]
        );
        assert_eq!(out.matches("[No text found on this page]").count(), 1);
        assert!(out.contains("Number of pages: 3"));
        assert!(out.ends_with("No images found in the PDF.\n"));
    }

    #[test]
    fn text_section_precedes_image_section() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = MockBackend::new(vec![MockPage::text("p1").with_images(&[3])])
            .with_image(3, "png", b"img");
        let (report, out) = run(&backend, tmp.path());

        let text_at = out.find("--- Extracting Text ---").unwrap();
        let images_at = out.find("--- Extracting Images ---").unwrap();
        let saved_at = out.find("Saved image:").unwrap();
        assert!(text_at < images_at && images_at < saved_at);
        assert_eq!(report.image_count(), 1);
        assert!(out.contains("Successfully extracted 1 images to"));
    }

    #[test]
    fn open_failure_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let out_dir = tmp.path().join("new");
        let backend = MockBackend::failing("file is damaged");
        let (report, out) = run(&backend, &out_dir);

        assert!(!report.opened());
        assert!(out.starts_with("Created directory:"));
        assert!(out.contains("Error opening PDF file: failed to open PDF: file is damaged"));
        assert!(!out.contains("--- Extracting Text ---"));
    }

    #[test]
    fn unwritable_output_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let backend = MockBackend::new(vec![MockPage::text("p1")]);

        let mut buf = Vec::new();
        let result = run_extraction(
            Path::new("doc.pdf"),
            &blocker.join("sub"),
            &backend,
            &mut buf,
            ColorMode(false),
        );
        assert!(result.is_err());
        assert_eq!(backend.open_count(), 0);
    }
}
