//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The two daily jobs are independent subcommands so a cron schedule can run
//! `collect` and `render` back to back or on separate machines.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Tirana housing index pipeline.
///
/// # Examples
///
/// ```sh
/// # Scrape today's listings and extend the history
/// tirana_housing_index collect -n neighborhoods.csv
///
/// # Rebuild the dashboard from the history
/// tirana_housing_index render -o ./site
///
/// # Reuse an already-running WebDriver server
/// tirana_housing_index collect --webdriver http://localhost:4444
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// The two daily batch jobs.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape listings per neighborhood and append today's indices to the history file
    Collect {
        /// Input CSV of neighborhood names, one per row, no header
        #[arg(short, long, default_value = "neighborhoods.csv")]
        neighborhoods: String,

        /// Output CSV for the cleaned listings snapshot (overwritten)
        #[arg(short, long, default_value = "listings_data.csv")]
        listings_out: String,

        /// The append-only historical indices CSV
        #[arg(long, env = "HIST_FILE", default_value = "historical_indices.csv")]
        history: String,

        /// Attach to a running WebDriver server instead of spawning geckodriver
        #[arg(long, env = "WEBDRIVER_URL")]
        webdriver: Option<String>,
    },

    /// Render charts, JSON series, the heatmap, and the dashboard from the history
    Render {
        /// The historical indices CSV written by `collect`
        #[arg(long, env = "HIST_FILE", default_value = "historical_indices.csv")]
        history: String,

        /// Static coordinate table (neighborhood,lat,lon)
        #[arg(short, long, default_value = "coordinates.csv")]
        coordinates: String,

        /// Directory the rendered site is written into
        #[arg(short, long, default_value = ".")]
        out_dir: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_defaults() {
        let cli = Cli::parse_from(["tirana_housing_index", "collect"]);
        match cli.command {
            Command::Collect {
                neighborhoods,
                listings_out,
                history,
                webdriver,
            } => {
                assert_eq!(neighborhoods, "neighborhoods.csv");
                assert_eq!(listings_out, "listings_data.csv");
                assert_eq!(history, "historical_indices.csv");
                assert!(webdriver.is_none());
            }
            _ => panic!("expected collect"),
        }
    }

    #[test]
    fn test_render_flags() {
        let cli = Cli::parse_from([
            "tirana_housing_index",
            "render",
            "--history",
            "/tmp/hist.csv",
            "-c",
            "/tmp/coords.csv",
            "-o",
            "./site",
        ]);
        match cli.command {
            Command::Render {
                history,
                coordinates,
                out_dir,
            } => {
                assert_eq!(history, "/tmp/hist.csv");
                assert_eq!(coordinates, "/tmp/coords.csv");
                assert_eq!(out_dir, "./site");
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn test_collect_webdriver_flag() {
        let cli = Cli::parse_from([
            "tirana_housing_index",
            "collect",
            "--webdriver",
            "http://localhost:4444",
        ]);
        match cli.command {
            Command::Collect { webdriver, .. } => {
                assert_eq!(webdriver.as_deref(), Some("http://localhost:4444"));
            }
            _ => panic!("expected collect"),
        }
    }
}
