use plotters::style::RGBColor;

use crate::ChartError;

/// One named series: a value per category, drawn in a single fill.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
    pub fill: RGBColor,
}

/// Category labels plus the series drawn side by side in each category.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDataset {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

pub const DARK_GRAY: RGBColor = RGBColor(0x40, 0x40, 0x40);
pub const LIGHT_GRAY: RGBColor = RGBColor(0xc0, 0xc0, 0xc0);
pub const BLACK: RGBColor = RGBColor(0x00, 0x00, 0x00);

impl ChartDataset {
    /// The ratings figure: correlation per painting style for P5, P6 and P4.
    pub fn ratings_by_painting_style() -> Self {
        let series = |name: &str, values: [f64; 2], fill| Series {
            name: name.to_string(),
            values: values.to_vec(),
            fill,
        };
        Self {
            title: "Ratings, by Painting Style".to_string(),
            x_label: "Painting style".to_string(),
            y_label: "Correlation".to_string(),
            categories: vec!["Abstract".to_string(), "Cubist".to_string()],
            series: vec![
                series("P5", [0.20, 0.07], DARK_GRAY),
                series("P6", [0.44, 0.26], LIGHT_GRAY),
                series("P4", [0.25, 0.35], BLACK),
            ],
        }
    }

    /// Check that every series has exactly one value per category.
    ///
    /// [`crate::render_to_path`] does not call this; a mismatched dataset
    /// renders, just not meaningfully.
    pub fn validate(&self) -> Result<(), ChartError> {
        for series in &self.series {
            if series.values.len() != self.categories.len() {
                return Err(ChartError::SeriesLength {
                    series: series.name.clone(),
                    expected: self.categories.len(),
                    found: series.values.len(),
                });
            }
        }
        Ok(())
    }
}
