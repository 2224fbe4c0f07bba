//! AllAnime provider.
//!
//! Search, episode listing and episode sources all go through one GraphQL
//! endpoint queried with `GET /api?variables=..&query=..`. Episode sources are
//! obfuscated tokens (prefixed with `--`). Most decode to `/clock.json`
//! pages listing the real links, some decode straight to a media file. Both
//! kinds are raced by a [`CandidateResolver`].

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::{
    config::ResolverConfig,
    decoder,
    error::{Error, Result},
    net::{HttpClient, json as json_path},
    provider::Provider,
    resolve::{Candidate, CandidateResolver, PriorityTable},
    types::{
        Anime, Episode, MediaClass, ProviderKind, QualityRequest, ResolvedStream, SearchParams,
        TranslationMode,
    },
};

pub const API_BASE: &str = "https://api.allanime.day";
const REFERER: &str = "https://allmanga.to";
const DEFAULT_LIMIT: usize = 40;

/// Marks a source URL as an obfuscated token.
const TOKEN_PREFIX: &str = "--";

const SEARCH_QUERY: &str = "query( $search: SearchInput $limit: Int $page: Int \
    $translationType: VaildTranslationTypeEnumType $countryOrigin: VaildCountryOriginEnumType ) \
    { shows( search: $search limit: $limit page: $page translationType: $translationType \
    countryOrigin: $countryOrigin ) { edges { _id name thumbnail availableEpisodes __typename } } }";

const EPISODES_QUERY: &str =
    "query ($showId: String!) { show( _id: $showId ) { _id availableEpisodesDetail } }";

const SOURCES_QUERY: &str = "query ($showId: String!, $translationType: VaildTranslationTypeEnumType!, \
    $episodeString: String!) { episode( showId: $showId translationType: $translationType \
    episodeString: $episodeString ) { episodeString sourceUrls } }";

static RESOLUTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3,4}p$").unwrap());

/// AllAnime GraphQL backend.
pub struct AllAnimeProvider {
    client: HttpClient,
    api_base: String,
    link_base: String,
    mode: TranslationMode,
    resolver: CandidateResolver,
    priority: PriorityTable,
}

impl AllAnimeProvider {
    pub fn new() -> Self {
        let client = HttpClient::new("AllAnime")
            .with_rate_limit(250)
            .with_max_retries(2)
            .with_header("Referer", REFERER)
            .with_header("Accept", "application/json");

        let config = ResolverConfig::default();
        Self {
            resolver: Self::build_resolver(&config),
            priority: config.priority_table(),
            client,
            api_base: API_BASE.to_string(),
            link_base: decoder::DEFAULT_BASE.to_string(),
            mode: TranslationMode::default(),
        }
    }

    // Candidate pages are paced by the resolver's gate, not the client limiter
    fn build_resolver(config: &ResolverConfig) -> CandidateResolver {
        let fetcher = HttpClient::new("AllAnime")
            .with_rate_limit(0)
            .with_max_retries(0)
            .with_header("Referer", REFERER);
        CandidateResolver::new(Arc::new(fetcher), Arc::new(extract_links)).with_config(config.clone())
    }

    /// Points both the API and the decoded candidate pages at `base`.
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        self.link_base = base.clone();
        self.api_base = base;
        self
    }

    /// Domain prepended to decoded candidate paths.
    pub fn with_link_base(mut self, base: impl Into<String>) -> Self {
        self.link_base = base.into();
        self
    }

    /// Translation used when listing episodes and resolving streams.
    pub fn with_mode(mut self, mode: TranslationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_resolver_config(mut self, config: ResolverConfig) -> Self {
        self.priority = config.priority_table();
        self.resolver = Self::build_resolver(&config);
        self
    }

    async fn graphql(&self, variables: Value, query: &str) -> Result<Value> {
        let url = format!(
            "{}/api?variables={}&query={}",
            self.api_base,
            urlencoding::encode(&variables.to_string()),
            urlencoding::encode(query)
        );

        let response: Value = self.client.get_json(&url).await?;
        if response.get("data").is_none_or(Value::is_null) {
            let message = json_path::extract_path(&response, "errors.0.message")
                .and_then(Value::as_str)
                .unwrap_or("response carried no data");
            return Err(Error::source(self.name(), message));
        }
        Ok(response)
    }
}

impl Default for AllAnimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for AllAnimeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AllAnime
    }

    fn name(&self) -> &'static str {
        "AllAnime"
    }

    fn language(&self) -> &'static str {
        "en"
    }

    fn base_url(&self) -> &str {
        &self.api_base
    }

    async fn search(&self, params: SearchParams) -> Result<Vec<Anime>> {
        let variables = json!({
            "search": { "allowAdult": false, "allowUnknown": false, "query": params.query },
            "limit": params.limit.unwrap_or(DEFAULT_LIMIT),
            "page": 1,
            "translationType": params.mode.as_str(),
            "countryOrigin": "ALL",
        });

        let response = self.graphql(variables, SEARCH_QUERY).await?;
        let mut shows = parse_shows(&response);
        if let Some(limit) = params.limit {
            shows.truncate(limit);
        }
        Ok(shows)
    }

    async fn list_items(&self, locator: &str) -> Result<Vec<Episode>> {
        let response = self
            .graphql(json!({ "showId": locator }), EPISODES_QUERY)
            .await?;
        Ok(parse_episodes(&response, locator, self.mode))
    }

    async fn resolve_stream(
        &self,
        locator: &str,
        episode: &str,
        quality: &QualityRequest,
    ) -> Result<ResolvedStream> {
        let variables = json!({
            "showId": locator,
            "translationType": self.mode.as_str(),
            "episodeString": episode,
        });

        let response = self.graphql(variables, SOURCES_QUERY).await?;
        let candidates = candidates(&response, &self.link_base);
        debug!(episode, candidates = candidates.len(), "Decoded AllAnime sources");

        let stream = self
            .resolver
            .resolve(candidates, quality, &self.priority)
            .await?;
        Ok(stream.with_provider(self.name()))
    }
}

#[derive(Deserialize)]
struct Show {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    thumbnail: Option<String>,
}

fn parse_shows(response: &Value) -> Vec<Anime> {
    json_path::extract_array(response, "data.shows.edges")
        .into_iter()
        .filter_map(|edge| serde_json::from_value::<Show>(edge).ok())
        .map(|show| Anime {
            id: show.id,
            title: show.name,
            thumbnail: show.thumbnail.filter(|t| t.starts_with("http")),
            source: None,
            language: None,
            media_class: MediaClass::Anime,
        })
        .collect()
}

fn parse_episodes(response: &Value, anime_id: &str, mode: TranslationMode) -> Vec<Episode> {
    let path = format!("data.show.availableEpisodesDetail.{}", mode.as_str());
    let mut episodes: Vec<Episode> = json_path::extract_array(response, &path)
        .iter()
        .filter_map(Value::as_str)
        .map(|reference| Episode {
            reference: reference.to_string(),
            number: reference.parse().unwrap_or(0.0),
            title: None,
            anime_id: anime_id.to_string(),
        })
        .collect();

    episodes.sort_by(|a, b| a.number.total_cmp(&b.number));
    episodes
}

/// Decodes every obfuscated source into a candidate, highest advertised
/// priority first.
///
/// `/clock.json` endpoints become pages to fetch. Anything else is already a
/// media URL, labelled `hls` for playlists and `mp4` otherwise.
fn candidates(response: &Value, link_base: &str) -> Vec<Candidate> {
    let mut sources: Vec<(f64, String)> =
        json_path::extract_array(response, "data.episode.sourceUrls")
            .iter()
            .filter_map(|source| {
                let url = source.get("sourceUrl")?.as_str()?;
                let token = url.strip_prefix(TOKEN_PREFIX)?;
                let priority = source.get("priority").and_then(Value::as_f64).unwrap_or(0.0);
                Some((priority, decoder::decode_with_base(token, link_base)))
            })
            .collect();

    sources.sort_by(|a, b| b.0.total_cmp(&a.0));
    sources
        .into_iter()
        .map(|(_, url)| {
            if url.contains("/clock.json") {
                Candidate::Page(url)
            } else if url.contains(".m3u8") {
                Candidate::direct("hls", url)
            } else {
                Candidate::direct("mp4", url)
            }
        })
        .collect()
}

/// Extracts quality-labelled links from a `/clock.json` candidate page.
///
/// Labels that look like a resolution (`1080p`) are kept, HLS playlists
/// become `hls`, anything else is labelled by its lowercased `resolutionStr`.
/// The first link wins a label collision.
pub fn extract_links(raw: &str) -> BTreeMap<String, String> {
    let Ok(page) = serde_json::from_str::<Value>(raw) else {
        return BTreeMap::new();
    };

    let mut links = BTreeMap::new();
    for entry in json_path::extract_array(&page, "links") {
        let Some(url) = entry.get("link").and_then(Value::as_str) else {
            continue;
        };
        let resolution = entry
            .get("resolutionStr")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        let hls = entry.get("hls").and_then(Value::as_bool).unwrap_or(false);

        let label = if RESOLUTION.is_match(&resolution) {
            resolution
        } else if hls || url.contains(".m3u8") {
            "hls".to_string()
        } else if !resolution.is_empty() {
            resolution
        } else {
            "mp4".to_string()
        };
        links.entry(label).or_insert_with(|| url.to_string());
    }
    links
}
