//! Provider trait and registry.
//!
//! This module defines the [`Provider`] trait every backend adapter
//! implements, and the [`Providers`] registry the search coordinator fans
//! out over.
//!
//! # Examples
//!
//! ```rust
//! use eizo::prelude::*;
//! use eizo::error::Result;
//!
//! # async fn example() -> Result<()> {
//! let providers = Providers::with_defaults();
//!
//! // Search across all providers
//! let results = providers.search("frieren").limit(10).flatten().await?;
//!
//! // List episodes and resolve a stream from a specific provider
//! if let Some(first) = results.first() {
//!     let provider = providers.get("allanime").unwrap();
//!     let episodes = provider.list_items(&first.id).await?;
//!     let stream = providers
//!         .resolve_stream("allanime", &first.id, &episodes[0].reference, &QualityRequest::Best)
//!         .await?;
//!     println!("{}", stream.url);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{
    config::Config,
    error::{Error, Result},
    search::SearchBuilder,
    types::{Anime, Episode, MediaClass, ProviderKind, QualityRequest, ResolvedStream, SearchParams},
};

/// Capability contract implemented by every backend adapter.
///
/// Providers are long-lived: configured once at construction and never
/// mutated afterwards, so they can be shared across concurrent searches.
///
/// # Required Methods
///
/// * [`kind()`](Provider::kind) - Stable type tag
/// * [`name()`](Provider::name) - Human-readable display name
/// * [`language()`](Provider::language) - Language/region tag of the content
/// * [`base_url()`](Provider::base_url) - Root URL of the backend
/// * [`search()`](Provider::search) - Find shows
/// * [`list_items()`](Provider::list_items) - List episodes of a show
/// * [`resolve_stream()`](Provider::resolve_stream) - Turn an episode into a playable URL
///
/// # Implementation Example
///
/// ```rust
/// use eizo::prelude::*;
/// use eizo::Result;
/// use async_trait::async_trait;
///
/// struct Archive;
///
/// #[async_trait]
/// impl Provider for Archive {
///     fn kind(&self) -> ProviderKind { ProviderKind::Other("archive") }
///     fn name(&self) -> &'static str { "Archive" }
///     fn language(&self) -> &'static str { "en" }
///     fn base_url(&self) -> &str { "https://archive.example" }
///
///     async fn search(&self, _params: SearchParams) -> Result<Vec<Anime>> {
///         Ok(vec![])
///     }
///
///     async fn list_items(&self, _locator: &str) -> Result<Vec<Episode>> {
///         Ok(vec![])
///     }
///
///     async fn resolve_stream(
///         &self,
///         _locator: &str,
///         _episode: &str,
///         _quality: &QualityRequest,
///     ) -> Result<ResolvedStream> {
///         Err(eizo::Error::NoUsableLink)
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable type tag; also the registry key.
    fn kind(&self) -> ProviderKind;

    fn name(&self) -> &'static str;

    /// Language/region tag, e.g. `"en"` or `"pt-BR"`.
    fn language(&self) -> &'static str;

    /// Backend class; defaults to anime.
    fn media_class(&self) -> MediaClass {
        MediaClass::Anime
    }

    fn base_url(&self) -> &str;

    /// Searches the backend. Entries may be returned untagged; the
    /// coordinator tags them with [`name()`](Provider::name) and
    /// [`language()`](Provider::language).
    async fn search(&self, params: SearchParams) -> Result<Vec<Anime>>;

    /// Lists the episodes of the show behind `locator` (an [`Anime::id`]).
    async fn list_items(&self, locator: &str) -> Result<Vec<Episode>>;

    /// Resolves one episode to a playable stream.
    async fn resolve_stream(
        &self,
        locator: &str,
        episode: &str,
        quality: &QualityRequest,
    ) -> Result<ResolvedStream>;
}

/// Registry of providers, keyed by type tag.
///
/// Adding a provider with a tag that is already registered replaces the
/// previous one.
pub struct Providers {
    providers: Vec<Arc<dyn Provider>>,
    by_tag: HashMap<&'static str, usize>,
    config: Config,
}

impl Providers {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            by_tag: HashMap::new(),
            config: Config::default(),
        }
    }

    /// Registry holding every provider enabled through cargo features.
    pub fn with_defaults() -> Self {
        Self::from_config(Config::default())
    }

    /// Registry holding every provider enabled through cargo features, each
    /// built from `config`: resolver tunables and base URL overrides are
    /// applied to the providers, search tunables to the coordinator.
    pub fn from_config(config: Config) -> Self {
        #[allow(unused_mut)]
        let mut providers = Self::new();

        #[cfg(feature = "provider-allanime")]
        {
            let mut allanime = crate::providers::AllAnimeProvider::new()
                .with_resolver_config(config.resolver.clone());
            if let Some(url) = &config.providers.allanime_url {
                allanime = allanime.with_base_url(url.as_str());
            }
            providers.add(allanime);
        }

        #[cfg(feature = "provider-animefire")]
        {
            let mut animefire = crate::providers::AnimeFireProvider::new()
                .with_resolver_config(config.resolver.clone());
            if let Some(url) = &config.providers.animefire_url {
                animefire = animefire.with_base_url(url.as_str());
            }
            providers.add(animefire);
        }

        providers.config = config;
        providers
    }

    /// Replaces the coordinator tunables.
    ///
    /// Providers already registered keep their own settings; use
    /// [`from_config`](Self::from_config) to build them from a config.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts a fluent search.
    pub fn search(&self, query: impl Into<String>) -> SearchBuilder<'_> {
        SearchBuilder::new(self, query)
    }

    pub fn add(&mut self, provider: impl Provider + 'static) -> &mut Self {
        self.add_shared(Arc::new(provider))
    }

    pub fn add_shared(&mut self, provider: Arc<dyn Provider>) -> &mut Self {
        let tag = provider.kind().as_str();
        match self.by_tag.get(tag) {
            Some(&index) => self.providers[index] = provider,
            None => {
                self.by_tag.insert(tag, self.providers.len());
                self.providers.push(provider);
            }
        }
        self
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn Provider>> {
        self.by_tag
            .get(tag)
            .and_then(|&index| self.providers.get(index))
            .cloned()
    }

    pub fn list_tags(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.kind().as_str()).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    /// Resolves an episode through the provider tagged `tag`.
    ///
    /// Failures are wrapped with the provider's display name; the returned
    /// metadata names the provider.
    pub async fn resolve_stream(
        &self,
        tag: &str,
        locator: &str,
        episode: &str,
        quality: &QualityRequest,
    ) -> Result<ResolvedStream> {
        let provider = self
            .get(tag)
            .ok_or_else(|| Error::ProviderNotFound(tag.to_string()))?;

        debug!(provider = provider.name(), episode, "Resolving stream");
        provider
            .resolve_stream(locator, episode, quality)
            .await
            .map(|stream| stream.with_provider(provider.name()))
            .map_err(|e| wrap_provider_error(provider.name(), e))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for Providers {
    fn default() -> Self {
        Self::new()
    }
}

/// Attaches the provider's display name unless the error already names it.
pub(crate) fn wrap_provider_error(name: &str, error: Error) -> Error {
    match error {
        Error::Source { .. } => error,
        other => Error::source(name, other.to_string()),
    }
}
