//! Throttled HTTP fetching with exponential backoff retry logic.
//!
//! Detail pages are fetched over plain HTTP (no browser), so this module is
//! where all of the politeness lives: a token-bucket throttle paces requests
//! across concurrent fetch tasks, user agents rotate per request, and a retry
//! decorator absorbs transient failures.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`FetchAsync`]: core trait defining an async page fetch
//! - [`PageFetcher`]: wraps a shared `reqwest` client with UA rotation
//! - [`RetryFetch`]: decorator that adds retry logic to any `FetchAsync`
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//!
//! Retries fire on transport errors and on 429/5xx responses; a 4xx other
//! than 429 fails immediately (the listing is gone, not throttled).

use rand::{rng, Rng};
use reqwest::StatusCode;
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::config::USER_AGENTS;

/// Trait for async page fetching.
///
/// Implementors fetch a URL and return its body. This abstraction exists so
/// decorators (like retry logic) compose over any fetch backend.
pub trait FetchAsync {
    /// The type of response body returned by a fetch.
    type Response;

    /// Fetch a URL and return its body, or an error if the request failed.
    async fn fetch(&self, url: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Error carrying the HTTP status of a rejected response.
///
/// Lets [`RetryFetch`] distinguish throttling and server trouble (retry)
/// from a dead listing URL (give up).
#[derive(Debug)]
pub struct StatusError {
    /// Status code the server answered with.
    pub status: StatusCode,
    /// URL the request was for, kept for log context.
    pub url: String,
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} for {}", self.status, self.url)
    }
}

impl Error for StatusError {}

fn is_retryable(e: &(dyn Error + 'static)) -> bool {
    match e.downcast_ref::<StatusError>() {
        Some(se) => {
            se.status == StatusCode::TOO_MANY_REQUESTS || se.status.is_server_error()
        }
        // Transport-level failures (timeouts, resets) are worth another try.
        None => true,
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FetchAsync`]
/// implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FetchAsync,
{
    /// Create a new retry wrapper around an existing [`FetchAsync`] implementation.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchAsync for RetryFetch<T>
where
    T: FetchAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch(url).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries || !is_retryable(e.as_ref()) {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "fetch() giving up"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// [`FetchAsync`] implementation over a shared `reqwest` client.
///
/// Each request carries a user agent drawn from the rotation pool.
#[derive(Debug)]
pub struct PageFetcher<'a> {
    /// Shared HTTP client (connection pool, timeout).
    pub client: &'a reqwest::Client,
}

impl<'a> FetchAsync for PageFetcher<'a> {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn fetch(&self, url: &str) -> Result<Self::Response, Box<dyn Error>> {
        let ua = USER_AGENTS[rng().random_range(0..USER_AGENTS.len())];
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, ua)
            .send()
            .await?;
        let dt = t0.elapsed();

        let status = resp.status();
        if !status.is_success() {
            warn!(elapsed_ms = dt.as_millis() as u128, %status, "Fetch rejected");
            return Err(Box::new(StatusError {
                status,
                url: url.to_string(),
            }));
        }
        Ok(resp.text().await?)
    }
}

/// High-level function to fetch a page with exponential backoff retry logic.
///
/// This is the primary entry point for downloading a detail page.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_with_backoff(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, Box<dyn Error>> {
    let t0 = Instant::now();
    let fetcher = PageFetcher { client };
    let api = RetryFetch::new(fetcher, 5, StdDuration::from_secs(1));
    let res = api.fetch(url).await;
    let dt = t0.elapsed();

    match &res {
        Ok(body) => info!(
            elapsed_ms_total = dt.as_millis() as u128,
            bytes = body.len(),
            "fetch_with_backoff succeeded"
        ),
        Err(e) => {
            error!(elapsed_ms_total = dt.as_millis() as u128, error = %e, "fetch_with_backoff failed")
        }
    }
    res
}

/// Token-bucket throttle shared by all detail fetch tasks.
///
/// Allowance refills continuously at `rate` tokens per second and is capped
/// at `rate`; a task that finds the bucket empty sleeps just long enough for
/// one token to accumulate.
#[derive(Debug)]
pub struct Throttle {
    rate: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    allowance: f64,
    last: Instant,
}

impl Throttle {
    /// Create a throttle sustaining `rate` requests per second.
    pub fn new(rate: f64) -> Self {
        Throttle {
            rate,
            state: Mutex::new(BucketState {
                allowance: rate,
                last: Instant::now(),
            }),
        }
    }

    /// Take one token, sleeping until the bucket allows it.
    pub async fn acquire(&self) {
        let to_sleep = {
            let mut s = self.state.lock().await;
            let now = Instant::now();
            let elapsed = now.duration_since(s.last).as_secs_f64();
            s.allowance = (s.allowance + elapsed * self.rate).min(self.rate);
            s.last = now;
            if s.allowance < 1.0 {
                let wait = (1.0 - s.allowance) / self.rate;
                s.allowance = 0.0;
                Some(StdDuration::from_secs_f64(wait))
            } else {
                s.allowance -= 1.0;
                None
            }
        };
        if let Some(wait) = to_sleep {
            sleep(wait).await;
        }
    }
}
