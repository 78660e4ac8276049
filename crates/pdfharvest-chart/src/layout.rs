//! Geometry of the grouped bar chart, independent of any drawing backend.

use crate::dataset::ChartDataset;

/// Width of one bar, and the spacing unit between bars of a group.
pub const BAR_WIDTH: f64 = 0.25;
pub const Y_MAX: f64 = 0.5;
pub const Y_TICK_STEP: f64 = 0.1;

/// One bar in data coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BarRect {
    pub series: usize,
    pub category: usize,
    pub x_left: f64,
    pub x_right: f64,
    pub height: f64,
}

impl BarRect {
    pub fn center(&self) -> f64 {
        (self.x_left + self.x_right) / 2.0
    }
}

/// Horizontal offset of series `index` from its category centre, in units
/// of [`BAR_WIDTH`]: the middle series sits on the centre.
pub fn series_offset(index: usize, series_count: usize) -> f64 {
    index as f64 - (series_count as f64 - 1.0) / 2.0
}

/// Bars for every (series, category) value, series-major.
///
/// Values past the category count are placed at their index anyway.
pub fn bar_layout(dataset: &ChartDataset) -> Vec<BarRect> {
    let count = dataset.series.len();
    let mut bars = Vec::new();
    for (s, series) in dataset.series.iter().enumerate() {
        let offset = series_offset(s, count) * BAR_WIDTH;
        for (c, &value) in series.values.iter().enumerate() {
            let center = c as f64 + offset;
            bars.push(BarRect {
                series: s,
                category: c,
                x_left: center - BAR_WIDTH / 2.0,
                x_right: center + BAR_WIDTH / 2.0,
                height: value,
            });
        }
    }
    bars
}

/// X range covering every category with half a unit of padding.
pub fn x_range(category_count: usize) -> std::ops::Range<f64> {
    -0.5..(category_count.max(1) as f64 - 0.5)
}

/// Y tick positions: 0, 0.1, ... up to [`Y_MAX`] inclusive.
pub fn y_ticks() -> Vec<f64> {
    let steps = (Y_MAX / Y_TICK_STEP).round() as usize;
    (0..=steps).map(|i| i as f64 * Y_TICK_STEP).collect()
}

/// Pixel metrics of the legend row.
#[derive(Debug, Clone, Copy)]
pub struct LegendMetrics {
    pub swatch: i32,
    pub label_gap: i32,
    pub entry_gap: i32,
    /// Estimated advance of one label character.
    pub char_width: i32,
}

impl Default for LegendMetrics {
    fn default() -> Self {
        Self {
            swatch: 14,
            label_gap: 6,
            entry_gap: 24,
            char_width: 8,
        }
    }
}

/// Left edge of each legend entry so that one row of entries is centred in
/// `area_width` pixels.
pub fn legend_positions(area_width: i32, labels: &[&str], metrics: LegendMetrics) -> Vec<i32> {
    let widths: Vec<i32> = labels
        .iter()
        .map(|l| metrics.swatch + metrics.label_gap + metrics.char_width * l.chars().count() as i32)
        .collect();
    let total: i32 = widths.iter().sum::<i32>()
        + metrics.entry_gap * (labels.len().saturating_sub(1) as i32);

    let mut x = (area_width - total) / 2;
    let mut positions = Vec::with_capacity(widths.len());
    for w in widths {
        positions.push(x);
        x += w + metrics.entry_gap;
    }
    positions
}
