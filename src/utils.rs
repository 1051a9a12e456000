//! Utility functions for slug generation, tag-value parsing, and file system
//! checks.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

static LEADING_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").unwrap());
static LEADING_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:[.,]\d+)?").unwrap());

/// Percent-encoded slug used in search URLs.
///
/// Lowercases, trims, replaces spaces with hyphens, then percent-encodes the
/// rest, so `Liqeni i Thatë` becomes `liqeni-i-that%C3%AB`.
pub fn url_slug(name: &str) -> String {
    urlencoding::encode(&name.trim().to_lowercase().replace(' ', "-")).into_owned()
}

/// Filesystem-safe slug used for chart filenames and HTML anchors.
///
/// Keeps alphanumerics and hyphens, drops everything else, and hyphenates
/// spaces. Unlike [`url_slug`] this never introduces `%` escapes.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(file_slug("Don Bosko"), "don-bosko");
/// assert_eq!(file_slug("Rr. e Kavajës"), "rr-e-kavajës");
/// ```
pub fn file_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Parse the leading integer of a tag value like `3+1` or `2 dhoma`.
pub fn parse_leading_u32(value: &str) -> Option<u32> {
    LEADING_INT
        .find(value.trim())
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse an area value like `120,5 m²` into square meters.
///
/// The portal renders decimals with a comma; both `,` and `.` are accepted.
pub fn parse_area_m2(value: &str) -> Option<f64> {
    LEADING_DECIMAL
        .find(value.trim())
        .and_then(|m| m.as_str().replace(',', ".").parse().ok())
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_slug() {
        assert_eq!(url_slug("Don Bosko"), "don-bosko");
        assert_eq!(url_slug("  Kombinat "), "kombinat");
        assert_eq!(url_slug("Liqeni i Thatë"), "liqeni-i-that%C3%AB");
    }

    #[test]
    fn test_file_slug() {
        assert_eq!(file_slug("Don Bosko"), "don-bosko");
        assert_eq!(file_slug("Rr. e Kavajës"), "rr-e-kavajës");
        assert_eq!(file_slug("Ali   Demi"), "ali-demi");
    }

    #[test]
    fn test_parse_leading_u32() {
        assert_eq!(parse_leading_u32("3+1"), Some(3));
        assert_eq!(parse_leading_u32(" 2 "), Some(2));
        assert_eq!(parse_leading_u32("garsonierë"), None);
    }

    #[test]
    fn test_parse_area_m2() {
        assert_eq!(parse_area_m2("120,5 m²"), Some(120.5));
        assert_eq!(parse_area_m2("85 m²"), Some(85.0));
        assert_eq!(parse_area_m2("62.3"), Some(62.3));
        assert_eq!(parse_area_m2("m²"), None);
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing() {
        let dir = std::env::temp_dir().join("thi_probe_test_dir");
        let _ = stdfs::remove_dir_all(&dir);
        ensure_writable_dir(dir.to_str().unwrap()).await.unwrap();
        assert!(dir.is_dir());
        let _ = stdfs::remove_dir_all(&dir);
    }
}
