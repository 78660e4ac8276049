use std::path::Path;
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;

use crate::ChartError;
use crate::dataset::ChartDataset;
use crate::layout::{LegendMetrics, Y_MAX, bar_layout, legend_positions, x_range, y_ticks};

/// Figure size in pixels (6x4 inches at 100 dpi).
pub const FIGURE_SIZE: (u32, u32) = (600, 400);
const LEGEND_HEIGHT: u32 = 40;
const FONT: &str = "sans-serif";
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
/// Grid line color (matplotlib's default `grid.color`).
const GRID_COLOR: RGBColor = RGBColor(0xB0, 0xB0, 0xB0);

/// Register the bundled DejaVu Sans as [`FONT`]. Text is only ever laid out
/// with this face, whatever the host has installed.
fn ensure_font() -> Result<(), ChartError> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let registered = *REGISTERED.get_or_init(|| {
        plotters::style::register_font(FONT, plotters::style::FontStyle::Normal, FONT_DATA)
            .is_ok()
    });
    if registered {
        Ok(())
    } else {
        Err(ChartError::Font)
    }
}

fn draw_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Draw(e.to_string())
}

/// Render `dataset` to `path`: SVG when the extension is `.svg`, PNG
/// otherwise.
pub fn render_to_path(dataset: &ChartDataset, path: &Path) -> Result<(), ChartError> {
    let is_svg = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if is_svg {
        let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
        draw(&root, dataset)?;
        root.present().map_err(draw_err)?;
    } else {
        let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
        draw(&root, dataset)?;
        root.present().map_err(draw_err)?;
    }
    tracing::debug!(path = %path.display(), "rendered chart");
    Ok(())
}

/// Render `dataset` as an SVG document held in memory.
pub fn render_svg(dataset: &ChartDataset) -> Result<String, ChartError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, FIGURE_SIZE).into_drawing_area();
        draw(&root, dataset)?;
        root.present().map_err(draw_err)?;
    }
    Ok(svg)
}

fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    dataset: &ChartDataset,
) -> Result<(), ChartError> {
    ensure_font()?;
    root.fill(&WHITE).map_err(draw_err)?;

    let (_, height) = root.dim_in_pixel();
    let (plot_area, legend_area) = root.split_vertically(height as i32 - LEGEND_HEIGHT as i32);

    let categories = dataset.categories.clone();
    let category_count = categories.len();

    let mut chart = ChartBuilder::on(&plot_area)
        .caption(&dataset.title, (FONT, 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range(category_count), 0f64..Y_MAX)
        .map_err(draw_err)?;

    // Only whole x positions are category centres; label nothing else.
    let category_label = move |x: &f64| {
        if (x - x.round()).abs() > 1e-6 || *x < 0.0 {
            return String::new();
        }
        categories.get(x.round() as usize).cloned().unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(&dataset.x_label)
        .y_desc(&dataset.y_label)
        .x_labels(category_count + 1)
        .y_labels(y_ticks().len())
        .x_label_formatter(&category_label)
        .y_label_formatter(&|y: &f64| format!("{:.1}", y))
        .label_style((FONT, 13))
        .draw()
        .map_err(draw_err)?;

    // Horizontal dashed grid only.
    let x = x_range(category_count);
    let grid_style = ShapeStyle::from(&GRID_COLOR).stroke_width(1);
    for tick in y_ticks() {
        chart
            .draw_series(DashedLineSeries::new(
                vec![(x.start, tick), (x.end, tick)],
                4,
                3,
                grid_style,
            ))
            .map_err(draw_err)?;
    }

    let bars = bar_layout(dataset);
    chart
        .draw_series(bars.iter().map(|bar| {
            let fill = dataset.series[bar.series].fill;
            Rectangle::new([(bar.x_left, 0.0), (bar.x_right, bar.height)], fill.filled())
        }))
        .map_err(draw_err)?;

    draw_legend(&legend_area, dataset)
}

/// One row of borderless legend entries, centred under the plot.
fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    dataset: &ChartDataset,
) -> Result<(), ChartError> {
    let metrics = LegendMetrics::default();
    let labels: Vec<&str> = dataset.series.iter().map(|s| s.name.as_str()).collect();
    let (width, height) = area.dim_in_pixel();
    let y = (height as i32 - metrics.swatch) / 2;

    for (series, x) in dataset
        .series
        .iter()
        .zip(legend_positions(width as i32, &labels, metrics))
    {
        area.draw(&Rectangle::new(
            [(x, y), (x + metrics.swatch, y + metrics.swatch)],
            series.fill.filled(),
        ))
        .map_err(draw_err)?;
        area.draw(&Text::new(
            series.name.clone(),
            (x + metrics.swatch + metrics.label_gap, y),
            (FONT, 13).into_font(),
        ))
        .map_err(draw_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_svg() -> String {
        render_svg(&ChartDataset::ratings_by_painting_style()).unwrap()
    }

    /// Value of attribute `name` in one SVG tag.
    fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
        let key = format!(" {name}=\"");
        let start = tag.find(&key)? + key.len();
        let len = tag[start..].find('"')?;
        Some(&tag[start..start + len])
    }

    /// Tags of element `name` (e.g. `rect`) in document order.
    fn tags<'a>(svg: &'a str, name: &str) -> Vec<&'a str> {
        svg.split('<')
            .filter(|t| t.starts_with(name) && t[name.len()..].starts_with(char::is_whitespace))
            .collect()
    }

    fn has_color(tag: &str, color: &RGBColor) -> bool {
        let hex = format!("#{:02X}{:02X}{:02X}", color.0, color.1, color.2);
        tag.to_ascii_uppercase().contains(&format!("\"{hex}\""))
    }

    /// Pixel points of every line or polyline stroked in `color`.
    fn strokes(svg: &str, color: &RGBColor) -> Vec<Vec<(f64, f64)>> {
        let mut out = Vec::new();
        for tag in tags(svg, "polyline") {
            if !has_color(tag, color) {
                continue;
            }
            let points = attr(tag, "points").unwrap();
            out.push(
                points
                    .split_whitespace()
                    .map(|p| -> (f64, f64) {
                        let (x, y) = p.split_once(',').unwrap();
                        (x.parse().unwrap(), y.parse().unwrap())
                    })
                    .collect(),
            );
        }
        for tag in tags(svg, "line") {
            if !has_color(tag, color) {
                continue;
            }
            let n = |k: &str| attr(tag, k).unwrap().parse::<f64>().unwrap();
            out.push(vec![(n("x1"), n("y1")), (n("x2"), n("y2"))]);
        }
        out
    }

    #[test]
    fn svg_contains_title_labels_and_legend() {
        let svg = chart_svg();
        for needle in [
            "Ratings, by Painting Style",
            "Correlation",
            "Painting style",
            "Abstract",
            "Cubist",
            "P5",
            "P6",
            "P4",
        ] {
            assert!(svg.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn grid_is_dashed_and_horizontal_at_y_ticks_only() {
        let svg = chart_svg();
        let grid = strokes(&svg, &GRID_COLOR);

        // Dashes: several segments per tick line.
        assert!(grid.len() > y_ticks().len(), "{} grid strokes", grid.len());
        for stroke in &grid {
            let y = stroke[0].1;
            assert!(
                stroke.iter().all(|&(_, py)| (py - y).abs() < 0.5),
                "non-horizontal grid stroke {stroke:?}"
            );
        }

        let mut rows: Vec<i64> = grid.iter().map(|s| s[0].1.round() as i64).collect();
        rows.sort_unstable();
        rows.dedup();
        assert_eq!(rows.len(), y_ticks().len());
    }

    #[test]
    fn bars_use_series_fills() {
        let svg = chart_svg();
        let rects = tags(&svg, "rect");
        for series in &ChartDataset::ratings_by_painting_style().series {
            // Two bars plus one legend swatch.
            let count = rects.iter().filter(|t| has_color(t, &series.fill)).count();
            assert_eq!(count, 3, "fill of {}", series.name);
        }
    }

    #[test]
    fn legend_is_one_borderless_row_below_the_plot() {
        let svg = chart_svg();
        let dataset = ChartDataset::ratings_by_painting_style();
        let legend_top = (FIGURE_SIZE.1 - LEGEND_HEIGHT) as f64;

        let swatches: Vec<&str> = tags(&svg, "rect")
            .into_iter()
            .filter(|t| attr(t, "y").unwrap().parse::<f64>().unwrap() >= legend_top)
            .collect();
        assert_eq!(swatches.len(), dataset.series.len());
        let row = attr(swatches[0], "y");
        assert!(swatches.iter().all(|t| attr(t, "y") == row));

        // No outline rectangle anywhere, legend frame included.
        assert!(tags(&svg, "rect").iter().all(|t| attr(t, "fill") != Some("none")));
    }

    #[test]
    fn png_file_is_written() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chart.png");
        render_to_path(&ChartDataset::ratings_by_painting_style(), &path).unwrap();
        assert!(std::fs::read(&path).unwrap().starts_with(b"\x89PNG"));
    }

    #[test]
    fn svg_extension_selects_svg_output() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chart.svg");
        render_to_path(&ChartDataset::ratings_by_painting_style(), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));
    }
}
