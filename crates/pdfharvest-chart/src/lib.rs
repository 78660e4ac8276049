//! The painting-style ratings figure: a grouped bar chart of three series
//! over two categories, rendered with plotters.

use thiserror::Error;

pub mod dataset;
pub mod layout;
pub mod render;

pub use dataset::{ChartDataset, Series};
pub use layout::{BarRect, bar_layout};
pub use render::{FIGURE_SIZE, render_svg, render_to_path};

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("series {series} has {found} values for {expected} categories")]
    SeriesLength {
        series: String,
        expected: usize,
        found: usize,
    },
    #[error("bundled font could not be registered")]
    Font,
    #[error("failed to draw chart: {0}")]
    Draw(String),
}
