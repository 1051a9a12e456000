//! The HTML dashboard index page.
//!
//! One card per neighborhood with its latest index value and trend chart, a
//! card for the overall average, and a link to the heatmap. The page is a
//! plain static file styled inline; it references the chart PNGs and
//! `map.html` by relative path, so the whole output directory can be served
//! or published as-is.

use std::error::Error;
use std::fmt::Write as _;
use std::path::Path;

use tokio::fs;
use tracing::{info, instrument, warn};

use crate::models::IndexRow;
use crate::stats::{overall_sale_series, sale_series_by_neighborhood};
use crate::utils::file_slug;

/// Assemble the dashboard page from the history.
pub fn build_page(rows: &[IndexRow]) -> Result<String, Box<dyn Error>> {
    let series = sale_series_by_neighborhood(rows);
    let overall = overall_sale_series(rows);
    let latest_date = rows.iter().map(|r| r.date.as_str()).max().unwrap_or("n/a");

    let mut html = String::new();
    html.push_str(concat!(
        "<!doctype html>\n",
        "<html lang=\"en\">\n",
        "<head>\n",
        "  <meta charset=\"utf-8\">\n",
        "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        "  <title>Daily Price/m² Dashboard</title>\n",
        "  <link href=\"https://fonts.googleapis.com/css2?family=Inter:wght@400;700&display=swap\" rel=\"stylesheet\">\n",
        "  <style>\n",
        "    body { font-family: 'Inter', sans-serif; margin: 0; padding: 1rem; background: #f9f9f9; color: #333; }\n",
        "    h1 { text-align: center; margin-bottom: 0.25rem; }\n",
        "    nav { text-align: center; margin-bottom: 1rem; }\n",
        "    .container { display: grid; grid-template-columns: repeat(auto-fit, minmax(300px, 1fr)); gap: 1rem; }\n",
        "    section { background: #fff; padding: 1rem; border-radius: 8px; box-shadow: 0 2px 5px rgba(0,0,0,0.1); }\n",
        "    section img { width: 100%; height: auto; border-radius: 4px; }\n",
        "    section h2 { margin-top: 0; }\n",
        "    .stale { color: #888; font-size: 0.85rem; }\n",
        "  </style>\n",
        "</head>\n",
        "<body>\n",
    ));

    writeln!(html, "  <h1>Prices on {latest_date}</h1>")?;
    html.push_str("  <nav><a href=\"map.html\">Neighborhood heatmap</a></nav>\n");
    html.push_str("  <div class=\"container\">\n");

    for (neighborhood, points) in &series {
        // Series points are date-sorted, so the last one is the freshest.
        let Some(latest) = points.last() else {
            continue;
        };
        let slug = file_slug(neighborhood);
        writeln!(html, "    <section>")?;
        writeln!(html, "      <h2>{neighborhood}</h2>")?;
        if latest.date == latest_date {
            writeln!(html, "      <p><strong>{:.2} €/m²</strong></p>", latest.value)?;
        } else {
            writeln!(
                html,
                "      <p><strong>{:.2} €/m²</strong> <span class=\"stale\">(as of {})</span></p>",
                latest.value, latest.date
            )?;
        }
        writeln!(
            html,
            "      <img src=\"static/graphs/{slug}.png\" alt=\"{neighborhood} chart\">"
        )?;
        writeln!(html, "    </section>")?;
    }

    if let Some(latest) = overall.last() {
        writeln!(html, "    <section>")?;
        writeln!(html, "      <h2>Overall average</h2>")?;
        writeln!(html, "      <p><strong>{:.2} €/m²</strong></p>", latest.value)?;
        writeln!(
            html,
            "      <img src=\"static/graphs/average.png\" alt=\"Overall chart\">"
        )?;
        writeln!(html, "    </section>")?;
    }

    html.push_str("  </div>\n</body>\n</html>\n");
    Ok(html)
}

/// Build and write `{out_dir}/dashboard.html`.
#[instrument(level = "info", skip_all, fields(%out_dir))]
pub async fn write_dashboard(rows: &[IndexRow], out_dir: &str) -> Result<(), Box<dyn Error>> {
    if rows.is_empty() {
        warn!("History is empty; dashboard will have no cards");
    }
    let html = build_page(rows)?;
    let path = Path::new(out_dir).join("dashboard.html");
    fs::write(&path, html).await?;
    info!(path = %path.display(), "Wrote dashboard");
    Ok(())
}
