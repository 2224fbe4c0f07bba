//! Error types and result handling for Eizo operations.
//!
//! This module defines the error handling system used throughout Eizo.
//! All operations return a [`Result<T>`] which is a type alias for `std::result::Result<T, Error>`.
//!
//! # Error Categories
//!
//! - **Aggregation Errors**: Every provider failed, or none returned anything
//! - **Resolution Errors**: No candidate endpoint produced a playable link in time
//! - **Network Errors**: Connection issues, timeouts, HTTP errors
//! - **Parse Errors**: Invalid HTML, JSON, or data format issues
//! - **Source Errors**: Provider-specific errors with context
//! - **Configuration Errors**: Invalid or unreadable tunables
//!
//! Individual provider and candidate failures never abort sibling work. They
//! only reach the caller in aggregate, when nothing usable was produced.
//!
//! # Examples
//!
//! ```rust
//! use eizo::prelude::*;
//! use eizo::error::{Result, Error};
//!
//! # async fn example() -> Result<()> {
//! let providers = Providers::new();
//!
//! match providers.search("frieren").from_provider("allanime").await {
//!     Ok(results) => println!("Found {} results", results.len()),
//!     Err(Error::ProviderNotFound(tag)) => println!("Unknown provider: {}", tag),
//!     Err(Error::Network(e)) => println!("Network error: {}", e),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Type alias for Results with Eizo errors.
///
/// ```rust
/// use eizo::{Result, Error};
///
/// fn example_operation() -> Result<String> {
///     Ok("Success".to_string())
/// }
///
/// fn example_with_error() -> Result<()> {
///     Err(Error::parse("Something went wrong"))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// A single provider's failure as recorded by the search coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Display name of the provider
    pub provider: String,
    /// Rendered cause
    pub cause: String,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            cause: cause.into(),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.cause)
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error type for all Eizo operations.
///
/// # Variants
///
/// * [`ProviderNotFound`](Error::ProviderNotFound) - Unknown explicit provider tag
/// * [`AggregateSearchFailed`](Error::AggregateSearchFailed) - Every provider failed
/// * [`NoResults`](Error::NoResults) - Every provider answered, all empty
/// * [`ResolutionTimeout`](Error::ResolutionTimeout) - Candidate race ran out of time
/// * [`NoUsableLink`](Error::NoUsableLink) - Every candidate finished, none usable
/// * [`Network`](Error::Network) - HTTP client and connection errors
/// * [`Parse`](Error::Parse) - Data parsing and format errors
/// * [`Source`](Error::Source) - Provider-specific errors with context
/// * [`NotFound`](Error::NotFound) - Missing resources
/// * [`RateLimit`](Error::RateLimit) - Rate limiting responses
/// * [`Config`](Error::Config) - Invalid configuration
#[derive(Error, Debug)]
pub enum Error {
    /// No registered provider carries the requested type tag.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// All queried providers failed.
    ///
    /// The message concatenates every `"<provider>: <error>"` pair, including
    /// the synthetic timeout failures of providers that never answered.
    #[error("All providers failed: {}", join_failures(.0))]
    AggregateSearchFailed(Vec<ProviderFailure>),

    /// Every provider answered successfully but with nothing.
    #[error("No results found")]
    NoResults,

    /// The candidate resolver exhausted its overall wait with no usable link.
    #[error("Stream resolution timed out after {0:?}")]
    ResolutionTimeout(Duration),

    /// All candidates were processed and none matched any quality rule.
    #[error("No usable stream link found")]
    NoUsableLink,

    /// Network-related errors from HTTP operations.
    ///
    /// Wraps errors from the underlying HTTP client (reqwest), including
    /// connection timeouts, DNS resolution failures, and TLS errors.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML/JSON parsing and data format errors.
    ///
    /// ```rust
    /// use eizo::Error;
    ///
    /// let error = Error::parse("Missing sourceUrls in episode response");
    /// ```
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider-specific errors with contextual information.
    ///
    /// # Fields
    ///
    /// * `src` - Display name of the provider that failed
    /// * `message` - Descriptive error message
    ///
    /// ```rust
    /// use eizo::Error;
    ///
    /// let error = Error::source("AllAnime", "HTTP 503 Service Unavailable");
    /// ```
    #[error("Source error [{src}]: {message}")]
    Source { src: String, message: String },

    /// Resource not found errors.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limiting errors from providers.
    ///
    /// Optionally carries the `Retry-After` header value in seconds.
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimit { retry_after: Option<u64> },

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization and deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error messages.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a parse error with the given message.
    ///
    /// ```rust
    /// use eizo::Error;
    ///
    /// let error = Error::parse(format!("Expected {} links, found {}", 3, 0));
    /// ```
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Creates a provider-specific error with provider name and message.
    pub fn source(src: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Source {
            src: src.into(),
            message: msg.into(),
        }
    }

    /// Creates a not found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a rate limit error with optional retry-after time.
    pub fn rate_limit(retry_after: Option<u64>) -> Self {
        Error::RateLimit { retry_after }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
