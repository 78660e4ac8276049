use std::io::Write;

use owo_colors::OwoColorize;
use pdfharvest_core::{NO_TEXT_SENTINEL, ProgressEvent, SEPARATOR};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn page_header(w: &mut dyn Write, index: usize, color: ColorMode) -> std::io::Result<()> {
    let header = format!("--- Text from Page {} ---", index + 1);
    if color.enabled() {
        writeln!(w, "{}", header.bold())
    } else {
        writeln!(w, "{}", header)
    }
}

/// Print one extraction event.
pub fn print_event(w: &mut dyn Write, event: &ProgressEvent, color: ColorMode) -> std::io::Result<()> {
    match event {
        ProgressEvent::OutputDirCreated { path } => {
            writeln!(w, "Created directory: {}", path.display())?;
        }
        ProgressEvent::OpenFailed { error, .. } => {
            if color.enabled() {
                writeln!(w, "{} {}", "Error opening PDF file:".red(), error)?;
            } else {
                writeln!(w, "Error opening PDF file: {}", error)?;
            }
        }
        ProgressEvent::Opened { path, page_count } => {
            writeln!(w, "Opened PDF: {}", path.display())?;
            writeln!(w, "Number of pages: {}", page_count)?;
            writeln!(w, "{}", SEPARATOR)?;
        }
        ProgressEvent::TextPhaseStarted => {
            writeln!(w, "\n--- Extracting Text ---\n")?;
        }
        ProgressEvent::PageText { index, text } => {
            page_header(w, *index, color)?;
            match text {
                Some(text) => writeln!(w, "{}", text)?,
                None if color.enabled() => writeln!(w, "{}", NO_TEXT_SENTINEL.dimmed())?,
                None => writeln!(w, "{}", NO_TEXT_SENTINEL)?,
            }
            writeln!(w, "{}", SEPARATOR)?;
        }
        ProgressEvent::PageTextFailed { index, error } => {
            page_header(w, *index, color)?;
            if color.enabled() {
                writeln!(w, "{} could not read page text: {}", "WARNING:".yellow(), error)?;
            } else {
                writeln!(w, "WARNING: could not read page text: {}", error)?;
            }
            writeln!(w, "{}", SEPARATOR)?;
        }
        ProgressEvent::ImagePhaseStarted => {
            writeln!(w, "\n--- Extracting Images ---\n")?;
        }
        ProgressEvent::ImageListFailed { index, error } => {
            let msg = format!("Error listing images on page {}: {}", index + 1, error);
            if color.enabled() {
                writeln!(w, "{}", msg.red())?;
            } else {
                writeln!(w, "{}", msg)?;
            }
        }
        ProgressEvent::ImageSaved { path, .. } => {
            if color.enabled() {
                writeln!(w, "{} {}", "Saved image:".green(), path.display())?;
            } else {
                writeln!(w, "Saved image: {}", path.display())?;
            }
        }
        ProgressEvent::ImageDecodeFailed { index, xref, error } => {
            let msg = format!(
                "Error extracting image {} on page {}: {}",
                xref,
                index + 1,
                error
            );
            if color.enabled() {
                writeln!(w, "{}", msg.red())?;
            } else {
                writeln!(w, "{}", msg)?;
            }
        }
        ProgressEvent::ImageWriteFailed { path, error, .. } => {
            let msg = format!("Error saving image {}: {}", path.display(), error);
            if color.enabled() {
                writeln!(w, "{}", msg.red())?;
            } else {
                writeln!(w, "{}", msg)?;
            }
        }
        ProgressEvent::Finished {
            image_count,
            output_dir,
        } => {
            if *image_count == 0 {
                writeln!(w, "No images found in the PDF.")?;
            } else {
                let msg = format!(
                    "Successfully extracted {} images to '{}'",
                    image_count,
                    output_dir.display()
                );
                writeln!(w)?;
                if color.enabled() {
                    writeln!(w, "{}", msg.bold().green())?;
                } else {
                    writeln!(w, "{}", msg)?;
                }
            }
        }
    }
    Ok(())
}
