//! Core data types for shows, episodes, search parameters and resolved streams.
//!
//! This module defines the fundamental data structures used throughout Eizo:
//!
//! - [`Anime`] - A search result entry returned by a provider
//! - [`Episode`] - A single playable item of a show
//! - [`SearchParams`] - Parameters for searching across providers
//! - [`QualityRequest`] - Which quality the caller wants
//! - [`ResolvedLink`] / [`ResolvedStream`] - Output of stream resolution
//!
//! # Examples
//!
//! ```rust
//! use eizo::types::*;
//!
//! let mut entry = Anime {
//!     id: "ReooPAxPMsHM4KPMY".to_string(),
//!     title: "Sousou no Frieren".to_string(),
//!     thumbnail: None,
//!     source: None,
//!     language: None,
//!     media_class: MediaClass::Anime,
//! };
//! entry.tag("AllAnime", "en");
//! assert_eq!(entry.source.as_deref(), Some("AllAnime"));
//! ```

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable type tag of a provider.
///
/// The registry is keyed by [`ProviderKind::as_str`], which is also the tag
/// callers pass to [`SearchBuilder::from_provider`](crate::search::SearchBuilder::from_provider).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    AllAnime,
    AnimeFire,
    /// Out-of-tree adapters
    Other(&'static str),
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::AllAnime => "allanime",
            ProviderKind::AnimeFire => "animefire",
            ProviderKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class of backend a provider belongs to.
///
/// Searches that merge across classes use the early-return strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaClass {
    Anime,
    MovieTv,
}

/// A search result entry from a single provider.
///
/// Created once per search call and tagged exactly once with the provider's
/// source and language labels. Tagging an entry that already carries a source
/// is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    /// Opaque provider-specific locator (used for listing episodes)
    pub id: String,

    /// Display title
    pub title: String,

    /// Thumbnail image URL
    pub thumbnail: Option<String>,

    /// Provider display name this entry came from
    #[serde(default)]
    pub source: Option<String>,

    /// Language/region tag of the provider
    #[serde(default)]
    pub language: Option<String>,

    pub media_class: MediaClass,
}

impl Anime {
    /// Tags the entry with its source and language unless already tagged.
    pub fn tag(&mut self, source: &str, language: &str) {
        if self.is_tagged() {
            return;
        }
        self.source = Some(source.to_string());
        self.language = Some(language.to_string());
    }

    pub fn is_tagged(&self) -> bool {
        self.source.is_some()
    }
}

/// A single episode of a show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Provider reference used when resolving the stream
    pub reference: String,

    /// Episode number (decimal for specials like 12.5)
    pub number: f64,

    pub title: Option<String>,

    /// Locator of the show this episode belongs to
    pub anime_id: String,
}

/// Subtitled or dubbed release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    #[default]
    Sub,
    Dub,
}

impl TranslationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationMode::Sub => "sub",
            TranslationMode::Dub => "dub",
        }
    }
}

/// Search parameters for querying shows across providers.
///
/// ```rust
/// use eizo::types::{SearchParamsBuilder, TranslationMode};
///
/// let params = SearchParamsBuilder::default()
///     .query("one piece".to_string())
///     .limit(Some(20))
///     .mode(TranslationMode::Dub)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default, Builder)]
#[builder(setter(into))]
pub struct SearchParams {
    pub query: String,
    #[builder(default)]
    pub limit: Option<usize>,
    #[builder(default)]
    pub mode: TranslationMode,
}

impl From<String> for SearchParams {
    fn from(query: String) -> Self {
        SearchParams {
            query,
            ..Default::default()
        }
    }
}

impl From<&str> for SearchParams {
    fn from(query: &str) -> Self {
        SearchParams {
            query: query.to_string(),
            ..Default::default()
        }
    }
}

/// Requested stream quality.
///
/// Parsed from `"best"`, `"worst"`, or any exact label such as `"720p"`.
///
/// ```rust
/// use eizo::types::QualityRequest;
///
/// let q: QualityRequest = "720p".parse().unwrap();
/// assert_eq!(q, QualityRequest::Exact("720p".to_string()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QualityRequest {
    #[default]
    Best,
    Worst,
    Exact(String),
}

impl FromStr for QualityRequest {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "best" => QualityRequest::Best,
            "worst" => QualityRequest::Worst,
            label => QualityRequest::Exact(label.to_string()),
        })
    }
}

/// Container type of a resolved stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Hls,
    Mp4,
}

impl StreamType {
    /// Guesses the stream type from a quality label and URL.
    pub fn detect(label: &str, url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if label.starts_with("hls") || path.ends_with(".m3u8") {
            Some(StreamType::Hls)
        } else if path.ends_with(".mp4") {
            Some(StreamType::Mp4)
        } else {
            None
        }
    }
}

/// Priority flag carried by links from trusted domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
}

/// A single extracted link after quality and priority selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub quality: String,
    pub url: String,
    pub stream_type: Option<StreamType>,
    pub priority: Option<Priority>,
}

impl ResolvedLink {
    pub fn new(quality: impl Into<String>, url: impl Into<String>) -> Self {
        let quality = quality.into();
        let url = url.into();
        let stream_type = StreamType::detect(&quality, &url);
        Self {
            quality,
            url,
            stream_type,
            priority: None,
        }
    }

    pub fn with_priority(mut self) -> Self {
        self.priority = Some(Priority::High);
        self
    }
}

/// Metadata returned alongside a resolved stream URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub quality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_type: Option<StreamType>,
    /// Display name of the provider that produced the stream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// A playable stream URL with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub url: String,
    pub metadata: StreamMetadata,
}

impl ResolvedStream {
    pub fn is_priority(&self) -> bool {
        self.metadata.priority == Some(Priority::High)
    }

    pub(crate) fn with_provider(mut self, provider: &str) -> Self {
        self.metadata.provider = Some(provider.to_string());
        self
    }
}

impl From<ResolvedLink> for ResolvedStream {
    fn from(link: ResolvedLink) -> Self {
        ResolvedStream {
            url: link.url,
            metadata: StreamMetadata {
                quality: link.quality,
                priority: link.priority,
                stream_type: link.stream_type,
                provider: None,
            },
        }
    }
}
