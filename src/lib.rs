//! # Eizo - Unified anime stream source library
//!
//! Eizo searches several anime backends at once and turns an episode into a
//! single playable stream URL. Searches fan out to every provider under a
//! global deadline, so one slow or broken backend never stalls the rest.
//! Backends that hide their media behind obfuscated candidate pages are
//! resolved by racing those pages and preferring links on trusted domains.
//!
//! ## Features
//!
//! - **Fan-out Search**: One query, every provider, merged before a deadline
//! - **Early Return**: Optionally answer shortly after the first non-empty result
//! - **Candidate Racing**: Parallel resolution of indirect pages with a
//!   priority fast path and a paced dispatch gate
//! - **Quality Selection**: Best/worst/exact over a configurable ladder,
//!   preferring links from priority domains
//! - **Configurable**: Tunables load from TOML and `EIZO_` environment variables
//!
//! ## Quick Start
//!
//! ```rust
//! use eizo::prelude::*;
//! use eizo::error::Result;
//!
//! # async fn example() -> Result<()> {
//! let providers = Providers::with_defaults();
//!
//! let results = providers
//!     .search("frieren")
//!     .limit(20)
//!     .flatten()
//!     .await?
//!     .dedupe_by_title();
//!
//! for anime in &results {
//!     println!("{} [{}]", anime.title, anime.source.as_deref().unwrap_or("?"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Resolving a Stream
//!
//! ```rust,no_run
//! use eizo::prelude::*;
//! use eizo::error::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let providers = Providers::with_defaults();
//!
//!     let shows = providers.search("frieren").from_provider("allanime").await?;
//!     let show = &shows[0];
//!
//!     let provider = providers.get("allanime").ok_or(Error::ProviderNotFound("allanime".into()))?;
//!     let episodes = provider.list_items(&show.id).await?;
//!
//!     let stream = providers
//!         .resolve_stream("allanime", &show.id, &episodes[0].reference, &"720p".parse().unwrap())
//!         .await?;
//!     println!("{} ({})", stream.url, stream.metadata.quality);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`provider`]: Provider trait and registry
//! - [`search`]: Fan-out coordinator, fluent builder and result processing
//! - [`resolve`]: Candidate racing, priority table and quality selection
//! - [`decoder`]: Link token decoder
//! - [`providers`]: Backend implementations behind feature flags
//! - [`net`]: HTTP client, rate limiting and parsing utilities
//! - [`config`]: Tunables and their loader
//! - [`types`]: Core data structures
//! - [`error`]: Error taxonomy
//!
//! ## Logging
//!
//! Eizo emits [`tracing`] events and never installs a subscriber; wire one
//! up in your binary to see them.

pub mod config;
pub mod decoder;
pub mod error;
pub mod net;
pub mod provider;
pub mod providers;
pub mod resolve;
pub mod search;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```rust
/// use eizo::prelude::*;
///
/// // Now you have access to:
/// // - Providers, Provider trait
/// // - SearchBuilder, SearchResultExt
/// // - Anime, Episode, SearchParams, QualityRequest, ResolvedStream, ...
/// ```
pub mod prelude {
    pub use crate::{
        config::Config,
        error::Error,
        provider::{Provider, Providers},
        search::{SearchBuilder, SearchResultExt},
        types::{
            Anime, Episode, MediaClass, ProviderKind, QualityRequest, ResolvedStream,
            SearchParams, StreamMetadata, TranslationMode,
        },
    };
}

// Re-export main types at crate root for direct access
pub use config::{Config, load_config};
pub use error::{Error, Result};
pub use provider::{Provider, Providers};
pub use search::{SearchBuilder, SearchResultExt};
pub use types::{Anime, Episode, QualityRequest, ResolvedStream, SearchParams};
