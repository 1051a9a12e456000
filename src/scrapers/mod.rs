//! Listing scrapers for the classifieds portals we index.
//!
//! Each scraper follows a consistent two-phase pattern:
//!
//! 1. **Indexing**: discover listing URLs from a neighborhood's search page
//!    (browser-rendered, since the result grid is built by JS)
//! 2. **Fetching**: download and parse listing detail pages over plain HTTP
//!
//! # Supported portals
//!
//! | Portal | Module | Notes |
//! |--------|--------|-------|
//! | MerrJep | [`merrjep`] | Tirana apartment listings by neighborhood |
//!
//! # Common Patterns
//!
//! Scrapers use:
//! - Concurrent detail fetching with `futures::stream` for throughput,
//!   bounded and throttled to stay polite
//! - Graceful error handling (failed fetches are logged and skipped)

pub mod merrjep;
