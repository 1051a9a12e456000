//! CSV persistence: input tables, the listings snapshot, and the append-only
//! historical indices file.
//!
//! # Files
//!
//! - `neighborhoods.csv` — input, headerless, one neighborhood name per row
//! - `coordinates.csv` — input, `neighborhood,lat,lon` with a header
//! - `listings_data.csv` — cleaned listings snapshot, overwritten per run
//! - `historical_indices.csv` — append-only daily index rows
//!
//! # Append vs Replace
//!
//! The history file is the pipeline's only persistent state, so it is never
//! rewritten: the first run creates it with a header, and every later run
//! appends headerless rows.

use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;

use tracing::{info, instrument, warn};

use crate::models::{IndexRow, Listing, Pin};

/// Read the neighborhood input list.
///
/// The file is headerless; the first column of every non-empty row is a
/// neighborhood name.
#[instrument(level = "info", skip_all, fields(%path))]
pub fn read_neighborhoods(path: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut neighborhoods = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(name) = record.get(0) {
            let name = name.trim();
            if !name.is_empty() {
                neighborhoods.push(name.to_string());
            }
        }
    }
    info!(count = neighborhoods.len(), "Read neighborhoods");
    Ok(neighborhoods)
}

/// Read the static coordinate table.
#[instrument(level = "info", skip_all, fields(%path))]
pub fn read_pins(path: &str) -> Result<Vec<Pin>, Box<dyn Error>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut pins = Vec::new();
    for result in rdr.deserialize() {
        let pin: Pin = result?;
        pins.push(pin);
    }
    info!(count = pins.len(), "Read coordinate table");
    Ok(pins)
}

/// Overwrite the cleaned listings snapshot.
#[instrument(level = "info", skip_all, fields(%path, count = listings.len()))]
pub fn write_listings(path: &str, listings: &[Listing]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for listing in listings {
        wtr.serialize(listing)?;
    }
    wtr.flush()?;
    info!("Wrote listings snapshot");
    Ok(())
}

/// Append today's index rows to the history file.
///
/// Creates the file with a header row when absent; otherwise appends
/// headerless rows so the history keeps exactly one header.
#[instrument(level = "info", skip_all, fields(%path, count = rows.len()))]
pub fn append_history(path: &str, rows: &[IndexRow]) -> Result<(), Box<dyn Error>> {
    if rows.is_empty() {
        warn!("No index rows to append");
        return Ok(());
    }

    if Path::new(path).exists() {
        let file = OpenOptions::new().append(true).open(path)?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        info!("Appended index rows to history");
    } else {
        let mut wtr = csv::Writer::from_path(path)?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        info!("Created history file");
    }
    Ok(())
}

/// Load the full history.
#[instrument(level = "info", skip_all, fields(%path))]
pub fn load_history(path: &str) -> Result<Vec<IndexRow>, Box<dyn Error>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: IndexRow = result?;
        rows.push(row);
    }
    info!(count = rows.len(), "Loaded history");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("thi_store_tests");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_read_neighborhoods_headerless() {
        let path = temp_path("neighborhoods.csv");
        fs::write(&path, "Blloku\nKombinat\n\nDon Bosko\n").unwrap();
        let nbs = read_neighborhoods(path.to_str().unwrap()).unwrap();
        assert_eq!(nbs, vec!["Blloku", "Kombinat", "Don Bosko"]);
    }

    #[test]
    fn test_read_pins() {
        let path = temp_path("coordinates.csv");
        fs::write(
            &path,
            "neighborhood,lat,lon\nBlloku,41.3204,19.8141\nKombinat,41.3086,19.7696\n",
        )
        .unwrap();
        let pins = read_pins(path.to_str().unwrap()).unwrap();
        assert_eq!(pins.len(), 2);
        assert_eq!(pins[0].neighborhood, "Blloku");
        assert!((pins[1].lat - 41.3086).abs() < 1e-9);
    }

    #[test]
    fn test_append_history_creates_then_appends() {
        let path = temp_path("historical_indices.csv");
        let _ = fs::remove_file(&path);

        let day1 = vec![IndexRow {
            date: "2025-08-06".to_string(),
            neighborhood: "Blloku".to_string(),
            avg_sale_price_per_m2: Some(2000.0),
            avg_rent_price: None,
            avg_rent_price_per_m2: None,
            avg_rooms: Some(2.0),
        }];
        let day2 = vec![IndexRow {
            date: "2025-08-07".to_string(),
            neighborhood: "Blloku".to_string(),
            avg_sale_price_per_m2: Some(2100.0),
            avg_rent_price: Some(500.0),
            avg_rent_price_per_m2: Some(8.3),
            avg_rooms: Some(2.5),
        }];

        append_history(path.to_str().unwrap(), &day1).unwrap();
        append_history(path.to_str().unwrap(), &day2).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("date,neighborhood").count(), 1);

        let rows = load_history(path.to_str().unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2025-08-06");
        assert_eq!(rows[1].avg_rent_price, Some(500.0));
    }

    #[test]
    fn test_append_history_empty_is_noop() {
        let path = temp_path("empty_history.csv");
        let _ = fs::remove_file(&path);
        append_history(path.to_str().unwrap(), &[]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_write_listings_roundtrip() {
        let path = temp_path("listings_data.csv");
        let listings = vec![
            Listing::from_parts("Blloku", 150_000, Some(2), 75.0, Category::Sale).unwrap(),
            Listing::from_parts("Blloku", 500, None, 60.0, Category::Rent).unwrap(),
        ];
        write_listings(path.to_str().unwrap(), &listings).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let back: Vec<Listing> = rdr.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].price, 150_000);
        assert_eq!(back[1].category, Category::Rent);
        assert_eq!(back[1].rooms, None);
    }
}
