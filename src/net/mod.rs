//! Network utilities for HTTP requests, pacing, and content parsing.
//!
//! This module provides the networking infrastructure for Eizo, including:
//!
//! - **HTTP Client**: A global, configured HTTP client with connection pooling
//! - **Rate Limiting**: Per-provider politeness delay between requests
//! - **Rate Gate**: Per-call admission pacing for candidate races
//! - **Retry Logic**: Automatic retries with exponential backoff
//! - **Content Parsing**: HTML and JSON parsing utilities
//!
//! # Examples
//!
//! ```rust
//! use eizo::net::HttpClient;
//!
//! # async fn example() -> eizo::Result<()> {
//! let client = HttpClient::new("allanime")
//!     .with_rate_limit(250)
//!     .with_max_retries(2)
//!     .with_header("Referer", "https://allmanga.to");
//!
//! let body = client.get_text("https://example.com").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use reqwest::{Client, header::HeaderMap};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::resolve::PageFetcher;

pub mod html;
pub mod json;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0";

/// Global HTTP client instance.
///
/// Configured with a 20-second timeout, connection pooling, gzip/brotli and a
/// browser User-Agent (several providers reject unknown agents). Built lazily
/// on first use and shared by every [`HttpClient`].
static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .user_agent(USER_AGENT)
        .pool_max_idle_per_host(10)
        .gzip(true)
        .brotli(true)
        .build()
        .expect("Failed to build HTTP client")
});

/// Per-provider rate limiter enforcing a minimum delay between requests.
///
/// Tracks the last request time for each provider. Safe to share across tasks.
#[derive(Debug)]
pub struct RateLimiter {
    last_request: Mutex<HashMap<String, Instant>>,
    default_delay: Duration,
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            last_request: Mutex::new(HashMap::new()),
            default_delay: self.default_delay,
        }
    }
}

impl RateLimiter {
    /// Creates a new rate limiter with the given delay in milliseconds.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(HashMap::new()),
            default_delay: Duration::from_millis(delay_ms),
        }
    }

    /// Waits if necessary before allowing a request for `provider`.
    pub async fn wait(&self, provider: &str) {
        let now = Instant::now();
        let wait_duration = {
            let last_map = self.last_request.lock();
            last_map.get(provider).and_then(|&last| {
                let elapsed = now.duration_since(last);
                (elapsed < self.default_delay).then(|| self.default_delay - elapsed)
            })
        };

        if let Some(duration) = wait_duration {
            tokio::time::sleep(duration).await;
        }

        self.last_request
            .lock()
            .insert(provider.to_string(), Instant::now());
    }
}

/// Fixed-interval admission gate scoped to a single resolution call.
///
/// Slot `n` opens `n` intervals after the gate was created, so dispatch
/// order follows the slot numbers the caller hands out rather than which
/// task happens to be polled first. Slot 0 is admitted at once and slots
/// whose time already passed are admitted immediately. This paces dispatch
/// to third-party hosts; it is not a token bucket and never outlives the
/// call that created it.
///
/// ```rust
/// use eizo::net::RateGate;
/// use std::time::Duration;
///
/// # async fn example() {
/// let gate = RateGate::new(Duration::from_millis(50));
/// gate.admit(0).await; // immediate
/// gate.admit(2).await; // ~100ms after creation
/// # }
/// ```
#[derive(Debug)]
pub struct RateGate {
    opened: Instant,
    interval: Duration,
}

impl RateGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            opened: Instant::now(),
            interval,
        }
    }

    /// Waits until `slot` opens.
    pub async fn admit(&self, slot: usize) {
        tokio::time::sleep_until(self.slot_time(slot)).await;
    }

    /// Instant at which `slot` opens.
    pub fn slot_time(&self, slot: usize) -> Instant {
        let slot = u32::try_from(slot).unwrap_or(u32::MAX);
        let offset = self.interval.saturating_mul(slot);
        // Same far-future fallback tokio uses for unbounded sleeps
        self.opened
            .checked_add(offset)
            .unwrap_or_else(|| self.opened + Duration::from_secs(86400 * 365 * 30))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// HTTP client wrapper with built-in rate limiting and retry logic.
///
/// Each client is associated with one provider and applies rate limiting
/// per provider.
///
/// ```rust
/// use eizo::net::HttpClient;
///
/// # async fn example() -> eizo::Result<()> {
/// let client = HttpClient::new("animefire")
///     .with_rate_limit(500)
///     .with_max_retries(3);
///
/// let html = client.get_text("https://animefire.plus/pesquisar/frieren").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct HttpClient {
    provider: String,
    rate_limiter: RateLimiter,
    max_retries: u32,
    headers: HeaderMap,
}

impl HttpClient {
    /// Creates a new HTTP client for `provider` with a 200ms delay and 3 retries.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            rate_limiter: RateLimiter::new(200),
            max_retries: 3,
            headers: HeaderMap::new(),
        }
    }

    /// Sets the minimum delay between requests in milliseconds.
    pub fn with_rate_limit(mut self, delay_ms: u64) -> Self {
        self.rate_limiter = RateLimiter::new(delay_ms);
        self
    }

    /// Sets the maximum number of retries for failed requests.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Adds a custom header to all requests made by this client.
    ///
    /// Invalid header names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<reqwest::header::HeaderName>(),
            value.parse::<reqwest::header::HeaderValue>(),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Performs a GET request with rate limiting and retries.
    ///
    /// 429 responses are retried with exponential backoff; when retries run
    /// out the `Retry-After` header is surfaced through
    /// [`Error::RateLimit`](crate::Error::RateLimit).
    ///
    /// # Errors
    ///
    /// * [`Error::RateLimit`](crate::Error::RateLimit) - If rate limited after retries
    /// * [`Error::Source`](crate::Error::Source) - For HTTP errors (4xx, 5xx)
    /// * [`Error::Network`](crate::Error::Network) - For network/connection errors
    pub async fn get(&self, url: &str) -> crate::Result<Bytes> {
        let mut attempts = 0;

        loop {
            self.rate_limiter.wait(&self.provider).await;

            match CLIENT.get(url).headers(self.headers.clone()).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response.bytes().await?);
                    }

                    if response.status() == 429 {
                        if attempts < self.max_retries {
                            attempts += 1;
                            let delay = Duration::from_secs(2_u64.pow(attempts));
                            debug!(provider = %self.provider, attempt = attempts, "Rate limited, backing off");
                            tokio::time::sleep(delay).await;
                            continue;
                        }

                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok());

                        return Err(crate::Error::rate_limit(retry_after));
                    }

                    return Err(crate::Error::source(
                        &self.provider,
                        format!("HTTP {}", response.status()),
                    ));
                }
                Err(e) => {
                    if attempts < self.max_retries {
                        attempts += 1;
                        debug!(provider = %self.provider, error = %e, attempt = attempts, "Request failed, retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Performs a GET request and returns the body as a UTF-8 string.
    pub async fn get_text(&self, url: &str) -> crate::Result<String> {
        let bytes = self.get(url).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| crate::Error::parse(format!("Invalid UTF-8: {}", e)))
    }

    /// Performs a GET request and deserializes the body as JSON.
    pub async fn get_json<T>(&self, url: &str) -> crate::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let bytes = self.get(url).await?;
        serde_json::from_slice(&bytes).map_err(Into::into)
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> crate::Result<String> {
        self.get_text(url).await
    }
}
