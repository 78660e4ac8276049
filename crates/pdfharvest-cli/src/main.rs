use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pdfharvest_core::config_file::{
    self, DEFAULT_CHART_PATH, DEFAULT_OUTPUT_DIR, DEFAULT_PDF_PATH, resolve_path,
};
use pdfharvest_pdf_mupdf::{MupdfBackend, write_sample_pdf};
use tracing_subscriber::EnvFilter;

mod extract;
mod output;

use output::ColorMode;

/// pdfharvest - Extract text and images from PDFs, and draw the ratings chart
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the text of every page and save every embedded image
    Extract {
        /// Path to the PDF file
        pdf_path: Option<PathBuf>,

        /// Directory the images are written to (created if missing)
        output_dir: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output log file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a small demo PDF first if the source file does not exist
        #[arg(long)]
        create_sample: bool,
    },

    /// Render the "Ratings, by Painting Style" bar chart
    Chart {
        /// Image file to write (.png or .svg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open the rendered file in the system viewer
        #[arg(long)]
        open: bool,
    },

    /// Write the two-page demo PDF
    Sample {
        /// Where to write the PDF
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config_file::load_config();

    match cli.command {
        Command::Extract {
            pdf_path,
            output_dir,
            no_color,
            output,
            create_sample,
        } => {
            // Resolve configuration: CLI args > env vars > config file > defaults
            let pdf_path = resolve_path(
                pdf_path,
                "PDFHARVEST_PDF",
                config.pdf_path(),
                DEFAULT_PDF_PATH,
            );
            let output_dir = resolve_path(
                output_dir,
                "PDFHARVEST_OUTPUT_DIR",
                config.output_dir(),
                DEFAULT_OUTPUT_DIR,
            );
            let use_color = !no_color && output.is_none() && config.color();
            extract_command(
                &pdf_path,
                &output_dir,
                output,
                create_sample,
                ColorMode(use_color),
            )
        }
        Command::Chart { output, open } => {
            let path = resolve_path(
                output,
                "PDFHARVEST_CHART",
                config.chart_path(),
                DEFAULT_CHART_PATH,
            );
            chart_command(&path, open)
        }
        Command::Sample { path } => {
            write_sample_pdf(&path)?;
            println!("Wrote sample PDF: {}", path.display());
            Ok(())
        }
    }
}

fn extract_command(
    pdf_path: &Path,
    output_dir: &Path,
    output: Option<PathBuf>,
    create_sample: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    let mut writer: Box<dyn Write> = if let Some(ref output_path) = output {
        Box::new(std::fs::File::create(output_path)?)
    } else {
        Box::new(std::io::stdout())
    };

    if create_sample && !pdf_path.exists() {
        writeln!(
            writer,
            "'{}' not found. Creating a dummy PDF for demonstration.",
            pdf_path.display()
        )?;
        write_sample_pdf(pdf_path)?;
        writeln!(writer, "Dummy '{}' created.", pdf_path.display())?;
    }

    let backend = MupdfBackend::new();
    let report = extract::run_extraction(pdf_path, output_dir, &backend, &mut writer, color)?;
    tracing::debug!(
        saved = report.image_count(),
        failed = report.failures.len(),
        opened = report.opened(),
        "extraction finished"
    );

    writeln!(writer, "\nExtraction process complete.")?;
    writer.flush()?;
    Ok(())
}

fn chart_command(path: &Path, open: bool) -> anyhow::Result<()> {
    let dataset = pdfharvest_chart::ChartDataset::ratings_by_painting_style();
    dataset.validate()?;
    pdfharvest_chart::render_to_path(&dataset, path)?;
    println!("Saved chart: {}", path.display());

    if open {
        open_in_viewer(path)?;
    }
    Ok(())
}

/// Hand `path` to the platform's default viewer without waiting for it.
fn open_in_viewer(path: &Path) -> anyhow::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };
    command
        .arg(path)
        .spawn()
        .map_err(|e| anyhow::anyhow!("could not open {}: {}", path.display(), e))?;
    Ok(())
}
