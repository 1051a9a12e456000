//! Data models for scraped listings and derived index records.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Listing`]: a single cleaned apartment advertisement
//! - [`Category`]: sale vs. rent classification of a listing
//! - [`IndexRow`]: one daily per-neighborhood row of the historical indices file
//! - [`SeriesPoint`]: a dated value used by JSON exports and chart rendering
//! - [`Pin`]: a neighborhood's map coordinates from the static coordinate table
//!
//! `IndexRow` and `Listing` derive serde so the `csv` crate can read and write
//! them directly; optional statistics become empty CSV fields.

use serde::{Deserialize, Serialize};

/// Whether a listing offers the apartment for sale or for rent.
///
/// Parsed from the listing's tag text: a tag containing `qera` marks a
/// rental, `shit` a sale. Listings without a recognizable tag default to
/// [`Category::Sale`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Apartment offered for sale.
    #[default]
    Sale,
    /// Apartment offered for rent.
    Rent,
}

/// A single scraped apartment listing after field extraction.
///
/// Constructed only when both a price and a positive area were parsed from
/// the detail page, so `price_per_m2` is always well-defined.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Listing {
    /// Neighborhood the search page was scoped to.
    pub neighborhood: String,
    /// Asking price in whole euros.
    pub price: u32,
    /// Room count from the `Numri i dhomave` tag, when present (`3+1` -> 3).
    pub rooms: Option<u32>,
    /// Floor area in square meters.
    pub area: f64,
    /// Sale or rent classification.
    pub category: Category,
    /// Derived `price / area` in euros per square meter.
    pub price_per_m2: f64,
}

impl Listing {
    /// Build a listing from parsed detail fields, deriving `price_per_m2`.
    ///
    /// Returns `None` unless the area is positive.
    pub fn from_parts(
        neighborhood: &str,
        price: u32,
        rooms: Option<u32>,
        area: f64,
        category: Category,
    ) -> Option<Self> {
        if area <= 0.0 {
            return None;
        }
        Some(Listing {
            neighborhood: neighborhood.to_string(),
            price,
            rooms,
            area,
            category,
            price_per_m2: f64::from(price) / area,
        })
    }

    /// Key used for exact-duplicate detection across a scrape run.
    pub fn dedup_key(&self) -> (String, u32, Option<u32>, u64, Category) {
        (
            self.neighborhood.clone(),
            self.price,
            self.rooms,
            self.area.to_bits(),
            self.category,
        )
    }
}

/// One daily per-neighborhood row of the historical indices file.
///
/// The `date` is kept as an ISO `YYYY-MM-DD` string so rows round-trip
/// through CSV unchanged and sort lexicographically in date order. Absent
/// statistics (e.g. a neighborhood with no rentals that day) serialize as
/// empty fields.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexRow {
    /// Local date of the collection run, `YYYY-MM-DD`.
    pub date: String,
    /// Neighborhood this row summarizes.
    pub neighborhood: String,
    /// Mean €/m² over sale listings, if any were collected.
    pub avg_sale_price_per_m2: Option<f64>,
    /// Mean monthly rent in euros over rent listings, if any.
    pub avg_rent_price: Option<f64>,
    /// Mean €/m² over rent listings, if any.
    pub avg_rent_price_per_m2: Option<f64>,
    /// Mean room count over listings that reported rooms.
    pub avg_rooms: Option<f64>,
}

/// A dated value in a rendered or exported time series.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SeriesPoint {
    /// ISO `YYYY-MM-DD` date.
    pub date: String,
    /// Series value (€/m²).
    pub value: f64,
}

/// One row of the static coordinate table (`coordinates.csv`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pin {
    /// Neighborhood name, matching the names in the history file.
    pub neighborhood: String,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_from_parts_derives_ppm2() {
        let listing =
            Listing::from_parts("Blloku", 150_000, Some(2), 75.0, Category::Sale).unwrap();
        assert_eq!(listing.price, 150_000);
        assert!((listing.price_per_m2 - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_listing_from_parts_rejects_zero_area() {
        assert!(Listing::from_parts("Blloku", 150_000, None, 0.0, Category::Sale).is_none());
    }

    #[test]
    fn test_dedup_key_distinguishes_category() {
        let sale = Listing::from_parts("Blloku", 500, None, 50.0, Category::Sale).unwrap();
        let rent = Listing::from_parts("Blloku", 500, None, 50.0, Category::Rent).unwrap();
        assert_ne!(sale.dedup_key(), rent.dedup_key());
    }

    #[test]
    fn test_index_row_csv_roundtrip_with_missing_fields() {
        let row = IndexRow {
            date: "2025-08-07".to_string(),
            neighborhood: "Kombinat".to_string(),
            avg_sale_price_per_m2: Some(1250.5),
            avg_rent_price: None,
            avg_rent_price_per_m2: None,
            avg_rooms: Some(2.5),
        };

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(&row).unwrap();
        let bytes = wtr.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(
            "date,neighborhood,avg_sale_price_per_m2,avg_rent_price,avg_rent_price_per_m2,avg_rooms"
        ));

        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let back: IndexRow = rdr.deserialize().next().unwrap().unwrap();
        assert_eq!(back.neighborhood, "Kombinat");
        assert_eq!(back.avg_sale_price_per_m2, Some(1250.5));
        assert_eq!(back.avg_rent_price, None);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(
            Listing::from_parts("Blloku", 140_000, Some(2), 70.0, Category::Sale).unwrap(),
        )
        .unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert!(text.contains(",sale,"));
    }
}
