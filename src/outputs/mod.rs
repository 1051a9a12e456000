//! Output generation modules for charts, JSON series, the heatmap, and the
//! dashboard page.
//!
//! # Submodules
//!
//! - [`charts`]: per-neighborhood and aggregate trend PNGs
//! - [`json`]: JSON time series exports for external consumers
//! - [`map`]: the time-sliced Leaflet heatmap page
//! - [`dashboard`]: the HTML index page linking everything
//!
//! # Output Structure
//!
//! ```text
//! out_dir/
//! ├── dashboard.html
//! ├── map.html
//! ├── data/
//! │   ├── series_by_neighborhood.json
//! │   └── series_overall.json
//! └── static/graphs/
//!     ├── average.png
//!     └── {neighborhood-slug}.png
//! ```

pub mod charts;
pub mod dashboard;
pub mod json;
pub mod map;
