//! MerrJep apartment listing scraper.
//!
//! Scrapes [MerrJep](https://www.merrjep.al), the largest Albanian
//! classifieds portal, scoped to apartment listings in Tirana.
//!
//! # URL Pattern
//!
//! Search pages live at `/njoftime/imobiliare-vendbanime/apartamente/tirane/q-{slug}`
//! and link each listing with relative hrefs that are resolved against the
//! portal base URL. Listing paths contain Albanian characters; `url::Url`
//! percent-encodes them during resolution.

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use rand::{rng, Rng};
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::browser::BrowserSession;
use crate::config::{self, BASE_URL, DETAIL_CONCURRENCY, SEARCH_SETTLE};
use crate::fetch::{fetch_with_backoff, Throttle};
use crate::models::{Category, Listing};
use crate::utils::{parse_area_m2, parse_leading_u32};

static ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a.Link_vis").unwrap());
static FALLBACK_ITEM_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li.announcement-item").unwrap());
static FALLBACK_ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static PRICE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("bdi.new-price span.format-money-int").unwrap());
static TAG_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a.tag-item, .tag-item").unwrap());
static TAG_LABEL_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());
static TAG_VALUE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("bdi").unwrap());

/// Fields parsed out of a listing detail page.
///
/// All fields are optional at this stage; [`fetch_listings`] decides which
/// combinations make a usable [`Listing`].
#[derive(Debug, Default, PartialEq)]
pub struct ListingDetail {
    /// Asking price in whole euros.
    pub price: Option<u32>,
    /// Leading room count from the `Numri i dhomave` tag.
    pub rooms: Option<u32>,
    /// Area in m² from the `Sipërfaqe` tag.
    pub area: Option<f64>,
    /// Sale or rent, defaulting to sale when no tag matches.
    pub category: Category,
}

/// Index a neighborhood's search page and extract listing URLs.
///
/// Loads the JS-rendered search page in the browser and extracts listing
/// anchors matching `a.Link_vis`. Some page variants render the grid without
/// that class; the fallback walks `li.announcement-item` containers and takes
/// each one's first anchor.
///
/// # Returns
///
/// Absolute listing URLs; empty (with a warning) when the page has no
/// recognizable listings.
#[instrument(level = "info", skip(browser))]
pub async fn index_listing_urls(
    browser: &BrowserSession,
    neighborhood: &str,
) -> Result<Vec<String>, Box<dyn Error>> {
    let search_url = config::search_url(neighborhood);
    let base_url = Url::parse(BASE_URL)?;

    let html = browser.page_source(&search_url, SEARCH_SETTLE).await?;
    let document = Html::parse_document(&html);

    let mut hrefs: Vec<String> = document
        .select(&ANCHOR_SEL)
        .filter_map(|a| a.value().attr("href"))
        .map(|h| h.to_string())
        .collect();

    if hrefs.is_empty() {
        hrefs = document
            .select(&FALLBACK_ITEM_SEL)
            .filter_map(|item| item.select(&FALLBACK_ANCHOR_SEL).next())
            .filter_map(|a| a.value().attr("href"))
            .map(|h| h.to_string())
            .collect();
        debug!(count = hrefs.len(), "Used fallback anchor selector");
    }

    let listing_urls: Vec<String> = hrefs
        .iter()
        .filter_map(|href| base_url.join(href).ok())
        .map(|u| u.to_string())
        .collect();

    if listing_urls.is_empty() {
        warn!(neighborhood, url = %search_url, "No listings found on search page");
    } else {
        info!(
            count = listing_urls.len(),
            neighborhood, "Indexed listing URLs"
        );
    }
    debug!(urls = ?listing_urls, "Listing URLs");

    Ok(listing_urls)
}

/// Fetch all of a neighborhood's listing details concurrently.
///
/// Downloads and parses each detail page, keeping listings that produced
/// both a price and a positive area. Failed fetches and unparseable pages
/// are logged and skipped without failing the batch.
#[instrument(level = "info", skip_all, fields(%neighborhood, count = urls.len()))]
pub async fn fetch_listings(
    client: &reqwest::Client,
    throttle: &Throttle,
    urls: Vec<String>,
    neighborhood: &str,
) -> Vec<Listing> {
    let listings: Vec<Listing> = stream::iter(urls)
        .map(|url| async move {
            throttle.acquire().await;
            // Small extra stagger so bursts don't line up on the bucket edge.
            let stagger_ms: u64 = rng().random_range(200..=500);
            sleep(Duration::from_millis(stagger_ms)).await;

            match fetch_with_backoff(client, &url).await {
                Ok(body) => {
                    let detail = parse_listing_detail(&body);
                    match (detail.price, detail.area) {
                        (Some(price), Some(area)) => {
                            let listing = Listing::from_parts(
                                neighborhood,
                                price,
                                detail.rooms,
                                area,
                                detail.category,
                            );
                            if listing.is_none() {
                                warn!(%url, "Listing has nonpositive area; skipping");
                            }
                            listing
                        }
                        _ => {
                            debug!(%url, ?detail, "Listing missing price or area; skipping");
                            None
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, %url, "Detail fetch failed");
                    None
                }
            }
        })
        .buffer_unordered(DETAIL_CONCURRENCY)
        .filter_map(|opt| std::future::ready(opt))
        .collect()
        .await;

    info!(
        count = listings.len(),
        neighborhood, "Fetched listing details"
    );
    listings
}

/// Parse price, rooms, area, and category out of a detail page.
///
/// The page encodes everything we need in two places: the price block
/// (`bdi.new-price span.format-money-int`) and the tag strip (`a.tag-item`),
/// whose entries pair a `span` label with a `bdi` value.
pub fn parse_listing_detail(html: &str) -> ListingDetail {
    let document = Html::parse_document(html);
    let mut detail = ListingDetail::default();

    if let Some(el) = document.select(&PRICE_SEL).next() {
        detail.price = extract_price(&el);
    }

    for tag in document.select(&TAG_SEL) {
        let text = tag.text().collect::<String>().to_lowercase();
        if text.contains("qera") {
            detail.category = Category::Rent;
            break;
        }
        if text.contains("shit") {
            detail.category = Category::Sale;
            break;
        }
    }

    for tag in document.select(&TAG_SEL) {
        let label = tag.select(&TAG_LABEL_SEL).next();
        let value = tag.select(&TAG_VALUE_SEL).next();
        let (Some(label), Some(value)) = (label, value) else {
            continue;
        };
        let label = label.text().collect::<String>();
        let label = label.trim().trim_end_matches(':');
        let value = value.text().collect::<String>();

        if label.contains("Numri i dhomave") {
            detail.rooms = parse_leading_u32(&value);
        } else if label.contains("Sipërfaqe") {
            detail.area = parse_area_m2(&value);
        }
    }

    detail
}

/// Extract an integer euro price from the price element.
///
/// The portal renders prices both as a `value` attribute and as formatted
/// text with `.`/`,` digit separators; the attribute wins when present.
fn extract_price(el: &ElementRef) -> Option<u32> {
    let raw = el
        .value()
        .attr("value")
        .map(|v| v.to_string())
        .unwrap_or_else(|| el.text().collect::<String>());
    let clean = raw.replace(['.', ','], "");
    let clean = clean.trim();
    if clean.is_empty() || !clean.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    clean.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_SALE: &str = r#"
        <html><body>
            <bdi class="new-price">Çmimi: <span class="format-money-int" value="155.000">155.000</span> EUR</bdi>
            <div class="tags">
                <a class="tag-item"><span>Lloji i njoftimit:</span> <bdi>Shitet</bdi></a>
                <a class="tag-item"><span>Numri i dhomave:</span> <bdi>2+1</bdi></a>
                <a class="tag-item"><span>Sipërfaqe:</span> <bdi>77,5 m²</bdi></a>
            </div>
        </body></html>"#;

    const DETAIL_RENT: &str = r#"
        <html><body>
            <bdi class="new-price"><span class="format-money-int">450</span> EUR</bdi>
            <div class="tags">
                <a class="tag-item"><span>Lloji i njoftimit:</span> <bdi>Jepet me qera</bdi></a>
                <a class="tag-item"><span>Sipërfaqe:</span> <bdi>60 m²</bdi></a>
            </div>
        </body></html>"#;

    const DETAIL_NO_PRICE: &str = r#"
        <html><body>
            <div class="tags">
                <a class="tag-item"><span>Sipërfaqe:</span> <bdi>60 m²</bdi></a>
            </div>
        </body></html>"#;

    const SEARCH_PAGE: &str = r#"
        <html><body>
            <a class="Link_vis" href="/njoftim/apartament-2-1-blloku">x</a>
            <a class="Link_vis" href="/njoftim/apartament-3-1-liqeni">y</a>
        </body></html>"#;

    const SEARCH_PAGE_FALLBACK: &str = r#"
        <html><body>
            <ul>
                <li class="announcement-item"><a href="/njoftim/apartament-1-1">x</a></li>
                <li class="announcement-item"><div><a href="/njoftim/apartament-2-1">y</a></div></li>
                <li class="announcement-item"><span>no link</span></li>
            </ul>
        </body></html>"#;

    #[test]
    fn test_parse_detail_sale() {
        let detail = parse_listing_detail(DETAIL_SALE);
        assert_eq!(detail.price, Some(155_000));
        assert_eq!(detail.rooms, Some(2));
        assert_eq!(detail.area, Some(77.5));
        assert_eq!(detail.category, Category::Sale);
    }

    #[test]
    fn test_parse_detail_rent_from_text_price() {
        let detail = parse_listing_detail(DETAIL_RENT);
        assert_eq!(detail.price, Some(450));
        assert_eq!(detail.rooms, None);
        assert_eq!(detail.area, Some(60.0));
        assert_eq!(detail.category, Category::Rent);
    }

    #[test]
    fn test_parse_detail_without_price() {
        let detail = parse_listing_detail(DETAIL_NO_PRICE);
        assert_eq!(detail.price, None);
        assert_eq!(detail.area, Some(60.0));
    }

    #[test]
    fn test_search_anchor_extraction() {
        let document = Html::parse_document(SEARCH_PAGE);
        let hrefs: Vec<_> = document
            .select(&ANCHOR_SEL)
            .filter_map(|a| a.value().attr("href"))
            .collect();
        assert_eq!(hrefs.len(), 2);
        assert_eq!(hrefs[0], "/njoftim/apartament-2-1-blloku");
    }

    #[test]
    fn test_search_fallback_extraction() {
        let document = Html::parse_document(SEARCH_PAGE_FALLBACK);
        assert_eq!(document.select(&ANCHOR_SEL).count(), 0);
        let hrefs: Vec<_> = document
            .select(&FALLBACK_ITEM_SEL)
            .filter_map(|item| item.select(&FALLBACK_ANCHOR_SEL).next())
            .filter_map(|a| a.value().attr("href"))
            .collect();
        assert_eq!(
            hrefs,
            vec!["/njoftim/apartament-1-1", "/njoftim/apartament-2-1"]
        );
    }

    #[test]
    fn test_extract_price_rejects_garbage() {
        let html = r#"<bdi class="new-price"><span class="format-money-int">Me marrëveshje</span></bdi>"#;
        let detail = parse_listing_detail(html);
        assert_eq!(detail.price, None);
    }

    #[test]
    fn test_detail_url_resolution_encodes_albanian_paths() {
        let base = Url::parse(BASE_URL).unwrap();
        let resolved = base.join("/njoftim/apartament-te-liqeni-i-thatë").unwrap();
        assert_eq!(
            resolved.as_str(),
            "https://www.merrjep.al/njoftim/apartament-te-liqeni-i-that%C3%AB"
        );
    }
}
