//! JSON time series exports for external consumers.
//!
//! Two files under `{out_dir}/data/`:
//!
//! ```text
//! data/
//! ├── series_by_neighborhood.json   # { "Blloku": [{date, value}, ...], ... }
//! └── series_overall.json           # [{date, value}, ...]
//! ```
//!
//! Dates ascend and rows with an absent sale index are dropped, so consumers
//! never see nulls. Each file is written to a temp name and renamed into
//! place so a crashed run can't leave a half-written export.

use std::error::Error;
use std::path::Path;

use tokio::fs;
use tracing::{info, instrument};

use crate::models::IndexRow;
use crate::stats::{overall_sale_series, sale_series_by_neighborhood};

async fn write_atomic(path: &Path, contents: &str) -> Result<(), Box<dyn Error>> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Write both series exports.
#[instrument(level = "info", skip_all, fields(%out_dir))]
pub async fn write_series(rows: &[IndexRow], out_dir: &str) -> Result<(), Box<dyn Error>> {
    let data_dir = Path::new(out_dir).join("data");
    fs::create_dir_all(&data_dir).await?;

    let by_neighborhood = sale_series_by_neighborhood(rows);
    let path = data_dir.join("series_by_neighborhood.json");
    write_atomic(&path, &serde_json::to_string_pretty(&by_neighborhood)?).await?;
    info!(path = %path.display(), series = by_neighborhood.len(), "Wrote neighborhood series");

    let overall = overall_sale_series(rows);
    let path = data_dir.join("series_overall.json");
    write_atomic(&path, &serde_json::to_string_pretty(&overall)?).await?;
    info!(path = %path.display(), points = overall.len(), "Wrote overall series");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeriesPoint;
    use std::collections::BTreeMap;

    fn row(date: &str, nb: &str, value: Option<f64>) -> IndexRow {
        IndexRow {
            date: date.to_string(),
            neighborhood: nb.to_string(),
            avg_sale_price_per_m2: value,
            avg_rent_price: None,
            avg_rent_price_per_m2: None,
            avg_rooms: None,
        }
    }

    #[tokio::test]
    async fn test_write_series_outputs_parse_back() {
        let out_dir = std::env::temp_dir().join("thi_json_tests");
        let _ = std::fs::remove_dir_all(&out_dir);
        let rows = vec![
            row("2025-08-06", "Blloku", Some(2000.0)),
            row("2025-08-07", "Blloku", Some(2100.0)),
            row("2025-08-07", "Kombinat", None),
        ];

        write_series(&rows, out_dir.to_str().unwrap()).await.unwrap();

        let text =
            std::fs::read_to_string(out_dir.join("data").join("series_by_neighborhood.json"))
                .unwrap();
        let parsed: BTreeMap<String, Vec<SeriesPoint>> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["Blloku"].len(), 2);
        assert!(!parsed.contains_key("Kombinat"));

        let text =
            std::fs::read_to_string(out_dir.join("data").join("series_overall.json")).unwrap();
        let overall: Vec<SeriesPoint> = serde_json::from_str(&text).unwrap();
        assert_eq!(overall.len(), 2);
        assert_eq!(overall[0].date, "2025-08-06");

        // No temp files left behind.
        let leftovers: Vec<_> = std::fs::read_dir(out_dir.join("data"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
