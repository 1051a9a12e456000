//! Fixed scraping constants: portal URLs, cleaning bounds, pacing knobs.
//!
//! Everything here describes the MerrJep portal and the cleaning policy, not
//! per-run options; anything a user might want to change per invocation lives
//! on the CLI instead.

use std::time::Duration;

use crate::utils::url_slug;

/// Portal base URL; listing hrefs are resolved against this.
pub const BASE_URL: &str = "https://www.merrjep.al";

/// Lower bound on plausible apartment area, in m².
pub const MIN_AREA: f64 = 20.0;
/// Upper bound on plausible apartment area, in m².
pub const MAX_AREA: f64 = 500.0;
/// Lower bound on plausible €/m².
pub const MIN_PPSM: f64 = 200.0;
/// Upper bound on plausible €/m².
pub const MAX_PPSM: f64 = 5000.0;

/// Neighborhoods per browser session. The portal's search pages accumulate
/// enough JS state that long-lived sessions degrade, so the browser is
/// restarted between batches.
pub const BROWSER_BATCH_SIZE: usize = 2;

/// Detail pages fetched concurrently per neighborhood.
pub const DETAIL_CONCURRENCY: usize = 6;

/// Sustained detail-request rate across all fetch tasks, per second.
pub const DETAIL_RATE_PER_SEC: f64 = 8.0;

/// Wait after navigation for the search page's JS to render its results.
pub const SEARCH_SETTLE: Duration = Duration::from_secs(2);

/// Per-request timeout for detail fetches.
pub const DETAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Desktop user agents rotated across detail requests.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.127 Safari/537.36",
];

/// Search page URL for one neighborhood's apartment listings in Tirana.
pub fn search_url(neighborhood: &str) -> String {
    format!(
        "{}/njoftime/imobiliare-vendbanime/apartamente/tirane/q-{}",
        BASE_URL,
        url_slug(neighborhood)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_slugs_and_encodes() {
        assert_eq!(
            search_url("Don Bosko"),
            "https://www.merrjep.al/njoftime/imobiliare-vendbanime/apartamente/tirane/q-don-bosko"
        );
        // Albanian characters are percent-encoded in the query slug.
        assert_eq!(
            search_url("Liqeni i Thatë"),
            "https://www.merrjep.al/njoftime/imobiliare-vendbanime/apartamente/tirane/q-liqeni-i-that%C3%AB"
        );
    }
}
