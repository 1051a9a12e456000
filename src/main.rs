//! # Tirana Housing Index
//!
//! A daily batch pipeline that tracks apartment prices across Tirana's
//! neighborhoods: it scrapes listings from the MerrJep classifieds portal,
//! aggregates per-neighborhood price statistics, appends them to an
//! append-only history file, and renders a static dashboard site.
//!
//! ## Features
//!
//! - Scrapes JS-rendered search pages through a headless browser and listing
//!   detail pages over throttled, retried plain HTTP
//! - Cleans the scrape: exact-duplicate removal and fixed outlier bounds on
//!   area and price-per-m²
//! - Appends daily per-neighborhood index rows to `historical_indices.csv`
//! - Renders per-neighborhood and aggregate trend PNGs, JSON time series,
//!   an interactive time-sliced heatmap, and an HTML dashboard
//!
//! ## Usage
//!
//! ```sh
//! tirana_housing_index collect
//! tirana_housing_index render -o ./site
//! ```
//!
//! ## Architecture
//!
//! Two independent jobs coupled only through the history file:
//! 1. **collect**: index each neighborhood's search page, fetch listing
//!    details, clean and aggregate them, append today's rows to the history
//! 2. **render**: load the history and coordinate table, then write charts,
//!    JSON series, the heatmap, and the dashboard

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod browser;
mod cli;
mod config;
mod fetch;
mod models;
mod outputs;
mod scrapers;
mod stats;
mod store;
mod utils;

use browser::BrowserSession;
use cli::{Cli, Command};
use config::{BROWSER_BATCH_SIZE, DETAIL_RATE_PER_SEC, DETAIL_TIMEOUT};
use fetch::Throttle;
use models::Listing;
use outputs::{charts, dashboard, json, map};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("tirana_housing_index starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    match args.command {
        Command::Collect {
            neighborhoods,
            listings_out,
            history,
            webdriver,
        } => run_collect(&neighborhoods, &listings_out, &history, webdriver.as_deref()).await?,
        Command::Render {
            history,
            coordinates,
            out_dir,
        } => run_render(&history, &coordinates, &out_dir).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// The daily collection job: scrape, clean, aggregate, append.
#[instrument(level = "info", skip_all)]
async fn run_collect(
    neighborhoods_path: &str,
    listings_out: &str,
    history_path: &str,
    webdriver: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let neighborhoods = store::read_neighborhoods(neighborhoods_path)?;
    if neighborhoods.is_empty() {
        warn!(path = %neighborhoods_path, "Neighborhood list is empty; nothing to collect");
        return Ok(());
    }

    let client = reqwest::Client::builder().timeout(DETAIL_TIMEOUT).build()?;
    let throttle = Throttle::new(DETAIL_RATE_PER_SEC);

    // Batches of two neighborhoods per browser session; the portal's search
    // pages degrade long-lived sessions, so the browser restarts in between.
    let mut all_listings: Vec<Listing> = Vec::new();
    for batch in neighborhoods.chunks(BROWSER_BATCH_SIZE) {
        let browser = match webdriver {
            Some(url) => BrowserSession::connect(url).await?,
            None => BrowserSession::spawn().await?,
        };

        for neighborhood in batch {
            match scrapers::merrjep::index_listing_urls(&browser, neighborhood).await {
                Ok(urls) => {
                    let listings =
                        scrapers::merrjep::fetch_listings(&client, &throttle, urls, neighborhood)
                            .await;
                    info!(
                        %neighborhood,
                        count = listings.len(),
                        "Finished neighborhood"
                    );
                    all_listings.extend(listings);
                }
                Err(e) => {
                    error!(%neighborhood, error = %e, "Search page failed; skipping neighborhood");
                }
            }
        }

        browser.shutdown().await;
    }
    info!(count = all_listings.len(), "Total listings scraped");

    let cleaned = stats::clean_listings(all_listings);
    store::write_listings(listings_out, &cleaned)?;

    let today = Local::now().date_naive();
    let rows = stats::daily_indices(&cleaned, today);
    store::append_history(history_path, &rows)?;

    Ok(())
}

/// The daily rendering job: history in, static site out.
#[instrument(level = "info", skip_all)]
async fn run_render(
    history_path: &str,
    coordinates_path: &str,
    out_dir: &str,
) -> Result<(), Box<dyn Error>> {
    // Early check: fail before touching the history if the target is read-only.
    if let Err(e) = ensure_writable_dir(out_dir).await {
        error!(
            path = %out_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let rows = store::load_history(history_path)?;
    let pins = store::read_pins(coordinates_path)?;

    charts::render_all(&rows, out_dir)?;
    json::write_series(&rows, out_dir).await?;
    map::write_heatmap(&rows, &pins, out_dir).await?;
    dashboard::write_dashboard(&rows, out_dir).await?;

    info!("Render complete");
    Ok(())
}
