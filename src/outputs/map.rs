//! Time-sliced heatmap page.
//!
//! `map.html` is a self-contained Leaflet page: one heat frame per history
//! date, a range slider to scrub through them, and all frame data embedded as
//! JSON so the file needs nothing but the CDN assets at view time.
//!
//! Heat weights are each date's sale €/m² values normalized against the
//! global maximum across all frames, so a frame with uniformly cheap prices
//! renders cooler than a frame at the market's peak rather than being
//! re-scaled to its own maximum.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::models::{IndexRow, Pin};

/// Map center: Tirana.
const CENTER: (f64, f64) = (41.3275, 19.8187);
const ZOOM: u32 = 13;

/// One slider position: a date and its heat points.
#[derive(Debug, Serialize, PartialEq)]
pub struct HeatFrame {
    /// ISO date shown next to the slider.
    pub date: String,
    /// `[lat, lon, weight]` triples, weight in (0, 1].
    pub points: Vec<[f64; 3]>,
}

/// Build one frame per history date from rows that have both a sale index
/// and a coordinate table entry.
///
/// Neighborhoods missing from the coordinate table are reported once each
/// and excluded; they still appear in charts and on the dashboard.
pub fn build_frames(rows: &[IndexRow], pins: &[Pin]) -> Vec<HeatFrame> {
    let coords: HashMap<&str, (f64, f64)> = pins
        .iter()
        .map(|p| (p.neighborhood.as_str(), (p.lat, p.lon)))
        .collect();

    let mut missing: HashSet<&str> = HashSet::new();
    let mut by_date: BTreeMap<&str, Vec<(f64, f64, f64)>> = BTreeMap::new();
    for row in rows {
        let Some(value) = row.avg_sale_price_per_m2 else {
            continue;
        };
        match coords.get(row.neighborhood.as_str()) {
            Some(&(lat, lon)) => {
                by_date
                    .entry(row.date.as_str())
                    .or_default()
                    .push((lat, lon, value));
            }
            None => {
                if missing.insert(row.neighborhood.as_str()) {
                    warn!(
                        neighborhood = %row.neighborhood,
                        "No coordinates for neighborhood; excluded from heatmap"
                    );
                }
            }
        }
    }

    let global_max = by_date
        .values()
        .flatten()
        .map(|&(_, _, v)| v)
        .fold(0.0_f64, f64::max);
    if global_max <= 0.0 {
        return Vec::new();
    }

    by_date
        .into_iter()
        .map(|(date, points)| HeatFrame {
            date: date.to_string(),
            points: points
                .into_iter()
                .map(|(lat, lon, v)| [lat, lon, v / global_max])
                .collect(),
        })
        .collect()
}

/// Assemble the heatmap page around the embedded frame data.
pub fn build_page(frames: &[HeatFrame]) -> Result<String, Box<dyn Error>> {
    let frames_json = serde_json::to_string(frames)?;

    let mut html = String::new();
    html.push_str(concat!(
        "<!doctype html>\n",
        "<html lang=\"en\">\n",
        "<head>\n",
        "  <meta charset=\"utf-8\">\n",
        "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        "  <title>Price/m² Heatmap</title>\n",
        "  <link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.css\">\n",
        "  <style>\n",
        "    body { margin: 0; font-family: sans-serif; }\n",
        "    #map { height: 85vh; }\n",
        "    #controls { height: 15vh; display: flex; align-items: center; gap: 1rem; padding: 0 1rem; }\n",
        "    #slider { flex: 1; }\n",
        "  </style>\n",
        "</head>\n",
        "<body>\n",
        "  <div id=\"map\"></div>\n",
        "  <div id=\"controls\">\n",
        "    <input id=\"slider\" type=\"range\" min=\"0\" step=\"1\">\n",
        "    <span id=\"date-label\"></span>\n",
        "  </div>\n",
        "  <script src=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.js\"></script>\n",
        "  <script src=\"https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js\"></script>\n",
        "  <script>\n",
    ));

    writeln!(html, "    const FRAMES = {frames_json};")?;
    writeln!(
        html,
        "    const map = L.map('map').setView([{}, {}], {});",
        CENTER.0, CENTER.1, ZOOM
    )?;

    html.push_str(concat!(
        "    L.tileLayer('https://tile.openstreetmap.org/{z}/{x}/{y}.png', {\n",
        "      attribution: '&copy; OpenStreetMap contributors'\n",
        "    }).addTo(map);\n",
        "    const heat = L.heatLayer([], { radius: 35, blur: 25, maxZoom: 15 }).addTo(map);\n",
        "    const slider = document.getElementById('slider');\n",
        "    const label = document.getElementById('date-label');\n",
        "    function showFrame(i) {\n",
        "      const frame = FRAMES[i];\n",
        "      if (!frame) { return; }\n",
        "      heat.setLatLngs(frame.points);\n",
        "      label.textContent = frame.date;\n",
        "    }\n",
        "    slider.max = Math.max(FRAMES.length - 1, 0);\n",
        "    slider.value = slider.max;\n",
        "    slider.addEventListener('input', () => showFrame(Number(slider.value)));\n",
        "    showFrame(Number(slider.value));\n",
        "  </script>\n",
        "</body>\n",
        "</html>\n",
    ));

    Ok(html)
}

/// Build and write `{out_dir}/map.html`.
#[instrument(level = "info", skip_all, fields(%out_dir))]
pub async fn write_heatmap(
    rows: &[IndexRow],
    pins: &[Pin],
    out_dir: &str,
) -> Result<(), Box<dyn Error>> {
    let frames = build_frames(rows, pins);
    if frames.is_empty() {
        warn!("No heat frames (no sale values with coordinates); writing empty map");
    }
    let html = build_page(&frames)?;
    let path = Path::new(out_dir).join("map.html");
    fs::write(&path, html).await?;
    info!(path = %path.display(), frames = frames.len(), "Wrote heatmap page");
    Ok(())
}
