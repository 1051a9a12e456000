//! Trend chart rendering with `plotters`.
//!
//! One 500×300 PNG per neighborhood plus an aggregate chart, all under
//! `{out_dir}/static/graphs/`. Filenames use the filesystem slug of the
//! neighborhood name; the dashboard computes the same slugs when it embeds
//! the images.

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use tracing::{info, instrument, warn};

use crate::models::{IndexRow, SeriesPoint};
use crate::stats::{overall_sale_series, sale_series_by_neighborhood};
use crate::utils::file_slug;

const FIGURE_SIZE: (u32, u32) = (500, 300);

/// Convert a series to `(date, value)` pairs, dropping unparseable dates.
fn dated_points(points: &[SeriesPoint]) -> Vec<(NaiveDate, f64)> {
    points
        .iter()
        .filter_map(|p| match NaiveDate::parse_from_str(&p.date, "%Y-%m-%d") {
            Ok(date) => Some((date, p.value)),
            Err(e) => {
                warn!(date = %p.date, error = %e, "Skipping point with bad date");
                None
            }
        })
        .collect()
}

/// X-axis range over the data, padded by a day per side when the series has
/// a single date so the lone point doesn't sit on the chart border.
fn x_range(points: &[(NaiveDate, f64)]) -> (NaiveDate, NaiveDate) {
    let min = points.iter().map(|(d, _)| *d).min().unwrap_or_default();
    let max = points.iter().map(|(d, _)| *d).max().unwrap_or_default();
    if min == max {
        (min - Duration::days(1), max + Duration::days(1))
    } else {
        (min, max)
    }
}

/// Y-axis range over the data with 10% headroom per side.
fn y_range(points: &[(NaiveDate, f64)]) -> (f64, f64) {
    let min = points.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max = points
        .iter()
        .map(|(_, v)| *v)
        .fold(f64::NEG_INFINITY, f64::max);
    let mut pad = (max - min) * 0.1;
    if pad <= 0.0 {
        pad = max.abs() * 0.1 + 1.0;
    }
    (min - pad, max + pad)
}

fn render_series(
    path: &Path,
    caption: &str,
    points: &[(NaiveDate, f64)],
) -> Result<(), Box<dyn Error>> {
    let (x_min, x_max) = x_range(points);
    let (y_min, y_max) = y_range(points);

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 16))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(55)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .y_desc("€/m²")
        .x_labels(6)
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points
            .iter()
            .map(|(d, v)| Circle::new((*d, *v), 3, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Render every neighborhood's trend chart plus the aggregate chart.
///
/// Neighborhoods whose sale series is empty get no chart; the aggregate
/// chart is skipped (with a warning) when the whole history has no sale
/// values at all.
#[instrument(level = "info", skip_all, fields(%out_dir, rows = rows.len()))]
pub fn render_all(rows: &[IndexRow], out_dir: &str) -> Result<(), Box<dyn Error>> {
    let graphs_dir: PathBuf = Path::new(out_dir).join("static").join("graphs");
    std::fs::create_dir_all(&graphs_dir)?;

    let mut rendered = 0usize;
    for (neighborhood, points) in sale_series_by_neighborhood(rows) {
        let points = dated_points(&points);
        if points.is_empty() {
            continue;
        }
        let path = graphs_dir.join(format!("{}.png", file_slug(&neighborhood)));
        render_series(&path, &format!("{neighborhood} €/m² over time"), &points)?;
        info!(path = %path.display(), %neighborhood, "Rendered trend chart");
        rendered += 1;
    }

    let overall = dated_points(&overall_sale_series(rows));
    if overall.is_empty() {
        warn!("History has no sale values; skipping aggregate chart");
    } else {
        let path = graphs_dir.join("average.png");
        render_series(&path, "Average €/m² across all neighborhoods", &overall)?;
        info!(path = %path.display(), "Rendered aggregate chart");
        rendered += 1;
    }

    info!(rendered, "Chart rendering complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, value: f64) -> SeriesPoint {
        SeriesPoint {
            date: date.to_string(),
            value,
        }
    }

    #[test]
    fn test_dated_points_drops_bad_dates() {
        let points = vec![point("2025-08-06", 2000.0), point("not-a-date", 1.0)];
        let dated = dated_points(&points);
        assert_eq!(dated.len(), 1);
        assert_eq!(dated[0].1, 2000.0);
    }

    #[test]
    fn test_x_range_pads_single_date() {
        let d = NaiveDate::from_ymd_opt(2025, 8, 7).unwrap();
        let (min, max) = x_range(&[(d, 2000.0)]);
        assert_eq!(min, d - Duration::days(1));
        assert_eq!(max, d + Duration::days(1));
    }

    #[test]
    fn test_x_range_spans_data() {
        let d1 = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 8, 7).unwrap();
        let (min, max) = x_range(&[(d1, 1.0), (d2, 2.0)]);
        assert_eq!((min, max), (d1, d2));
    }

    #[test]
    fn test_y_range_has_headroom() {
        let d = NaiveDate::from_ymd_opt(2025, 8, 7).unwrap();
        let (min, max) = y_range(&[(d, 1000.0), (d, 2000.0)]);
        assert!(min < 1000.0 && min > 800.0);
        assert!(max > 2000.0 && max < 2200.0);
    }

    #[test]
    fn test_y_range_flat_series_still_nonempty() {
        let d = NaiveDate::from_ymd_opt(2025, 8, 7).unwrap();
        let (min, max) = y_range(&[(d, 1500.0)]);
        assert!(min < 1500.0);
        assert!(max > 1500.0);
    }
}
