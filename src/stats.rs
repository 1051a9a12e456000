//! Cleaning and aggregation: dedup, outlier bounds, daily index rows, and
//! the time series the renderer consumes.
//!
//! All statistics are plain means over the values that are actually present;
//! a neighborhood with no sale listings on a given day gets `None` for its
//! sale index rather than a NaN, and series extraction drops absent values
//! the same way.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use itertools::Itertools;
use tracing::{debug, info, instrument};

use crate::config::{MAX_AREA, MAX_PPSM, MIN_AREA, MIN_PPSM};
use crate::models::{Category, IndexRow, Listing, SeriesPoint};

/// Deduplicate and drop outliers from a raw scrape.
///
/// Exact duplicates (the portal repeats listings across search page variants)
/// are removed first, then listings outside the fixed plausibility bounds:
/// area within [20, 500] m², price-per-m² within [200, 5000] €/m².
#[instrument(level = "info", skip_all, fields(raw = listings.len()))]
pub fn clean_listings(listings: Vec<Listing>) -> Vec<Listing> {
    let deduped: Vec<Listing> = listings
        .into_iter()
        .unique_by(|l| l.dedup_key())
        .collect();
    let deduped_count = deduped.len();

    let cleaned: Vec<Listing> = deduped
        .into_iter()
        .filter(|l| (MIN_AREA..=MAX_AREA).contains(&l.area))
        .filter(|l| (MIN_PPSM..=MAX_PPSM).contains(&l.price_per_m2))
        .collect();

    info!(
        deduped = deduped_count,
        kept = cleaned.len(),
        "Cleaned listings"
    );
    cleaned
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Compute one [`IndexRow`] per neighborhood for `date`.
///
/// Rows come out sorted by neighborhood name. Neighborhoods with no cleaned
/// listings at all produce no row.
#[instrument(level = "info", skip_all, fields(%date, listings = listings.len()))]
pub fn daily_indices(listings: &[Listing], date: NaiveDate) -> Vec<IndexRow> {
    let mut by_neighborhood: BTreeMap<&str, Vec<&Listing>> = BTreeMap::new();
    for listing in listings {
        by_neighborhood
            .entry(listing.neighborhood.as_str())
            .or_default()
            .push(listing);
    }

    let date = date.to_string();
    let rows: Vec<IndexRow> = by_neighborhood
        .into_iter()
        .map(|(neighborhood, group)| {
            let sale_ppm2: Vec<f64> = group
                .iter()
                .filter(|l| l.category == Category::Sale)
                .map(|l| l.price_per_m2)
                .collect();
            let rent_price: Vec<f64> = group
                .iter()
                .filter(|l| l.category == Category::Rent)
                .map(|l| f64::from(l.price))
                .collect();
            let rent_ppm2: Vec<f64> = group
                .iter()
                .filter(|l| l.category == Category::Rent)
                .map(|l| l.price_per_m2)
                .collect();
            let rooms: Vec<f64> = group
                .iter()
                .filter_map(|l| l.rooms)
                .map(f64::from)
                .collect();

            debug!(
                neighborhood,
                sale = sale_ppm2.len(),
                rent = rent_price.len(),
                "Computed neighborhood index"
            );

            IndexRow {
                date: date.clone(),
                neighborhood: neighborhood.to_string(),
                avg_sale_price_per_m2: mean(&sale_ppm2),
                avg_rent_price: mean(&rent_price),
                avg_rent_price_per_m2: mean(&rent_ppm2),
                avg_rooms: mean(&rooms),
            }
        })
        .collect();

    info!(rows = rows.len(), "Computed daily indices");
    rows
}

/// Per-neighborhood sale €/m² series, dates ascending, absent values dropped.
pub fn sale_series_by_neighborhood(rows: &[IndexRow]) -> BTreeMap<String, Vec<SeriesPoint>> {
    let mut series: BTreeMap<String, Vec<SeriesPoint>> = BTreeMap::new();
    for row in rows {
        if let Some(value) = row.avg_sale_price_per_m2 {
            series
                .entry(row.neighborhood.clone())
                .or_default()
                .push(SeriesPoint {
                    date: row.date.clone(),
                    value,
                });
        }
    }
    for points in series.values_mut() {
        points.sort_by(|a, b| a.date.cmp(&b.date));
    }
    series
}

/// Overall series: per date, the mean sale €/m² across neighborhoods that
/// reported one.
pub fn overall_sale_series(rows: &[IndexRow]) -> Vec<SeriesPoint> {
    let mut by_date: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in rows {
        if let Some(value) = row.avg_sale_price_per_m2 {
            by_date.entry(row.date.as_str()).or_default().push(value);
        }
    }
    by_date
        .into_iter()
        .filter_map(|(date, values)| {
            mean(&values).map(|value| SeriesPoint {
                date: date.to_string(),
                value,
            })
        })
        .collect()
}
