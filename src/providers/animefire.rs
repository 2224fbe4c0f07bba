//! AnimeFire provider (pt-BR).
//!
//! A direct backend: search results and episode lists are scraped from HTML,
//! and every episode exposes a JSON video endpoint listing its qualities, so
//! no candidate racing is involved.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::{
    config::ResolverConfig,
    error::{Error, Result},
    net::{HttpClient, html},
    provider::Provider,
    resolve::{PRIORITY_SUFFIX, PriorityTable, display_label, flag_priority_links, select_quality},
    types::{
        Anime, Episode, MediaClass, ProviderKind, QualityRequest, ResolvedLink, ResolvedStream,
        SearchParams,
    },
};

pub const BASE_URL: &str = "https://animefire.plus";

static EPISODE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d+(?:\.\d+)?)/?$").unwrap());

/// AnimeFire HTML backend.
pub struct AnimeFireProvider {
    client: HttpClient,
    base_url: String,
    priority: PriorityTable,
    ladder: Vec<String>,
}

impl AnimeFireProvider {
    pub fn new() -> Self {
        let client = HttpClient::new("AnimeFire")
            .with_rate_limit(500)
            .with_max_retries(3)
            .with_header("Accept", "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8")
            .with_header("Accept-Language", "pt-BR,pt;q=0.9,en;q=0.8");

        let config = ResolverConfig::default();
        Self {
            client,
            base_url: BASE_URL.to_string(),
            priority: config.priority_table(),
            ladder: config.quality_ladder,
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Uses the priority domains and quality ladder from `config`.
    pub fn with_resolver_config(mut self, config: ResolverConfig) -> Self {
        self.priority = config.priority_table();
        self.ladder = config.quality_ladder;
        self
    }
}

impl Default for AnimeFireProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for AnimeFireProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AnimeFire
    }

    fn name(&self) -> &'static str {
        "AnimeFire"
    }

    fn language(&self) -> &'static str {
        "pt-BR"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn search(&self, params: SearchParams) -> Result<Vec<Anime>> {
        let url = format!("{}/pesquisar/{}", self.base_url, search_slug(&params.query));
        let page = self.client.get_text(&url).await?;

        let mut results = parse_search(&page);
        if let Some(limit) = params.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn list_items(&self, locator: &str) -> Result<Vec<Episode>> {
        let url = format!("{}/animes/{}", self.base_url, locator);
        let page = self.client.get_text(&url).await?;
        Ok(parse_episodes(&page, locator))
    }

    async fn resolve_stream(
        &self,
        _locator: &str,
        episode: &str,
        quality: &QualityRequest,
    ) -> Result<ResolvedStream> {
        let url = format!("{}/video/{}", self.base_url, episode.trim_start_matches('/'));
        let videos: VideoList = self.client.get_json(&url).await?;

        let links = flag_priority_links(videos.into_links(), &self.priority);
        let (label, url) = select_quality(&links, quality, &self.ladder).ok_or(Error::NoUsableLink)?;

        let mut link = ResolvedLink::new(display_label(&label), url);
        if label.ends_with(PRIORITY_SUFFIX) {
            link = link.with_priority();
        }
        Ok(ResolvedStream::from(link).with_provider(self.name()))
    }
}

#[derive(Deserialize)]
struct VideoList {
    #[serde(default)]
    data: Vec<Video>,
}

#[derive(Deserialize)]
struct Video {
    src: String,
    label: String,
}

impl VideoList {
    fn into_links(self) -> BTreeMap<String, String> {
        let mut links = BTreeMap::new();
        for video in self.data {
            links
                .entry(video.label.trim().to_lowercase())
                .or_insert(video.src);
        }
        links
    }
}

/// Search paths use lowercase, dash-separated queries.
fn search_slug(query: &str) -> String {
    let slug = query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    urlencoding::encode(&slug).into_owned()
}

fn parse_search(page: &str) -> Vec<Anime> {
    let document = html::parse(page);
    html::parse_items(&document, "div.divCardUltimosEps", parse_card)
}

fn parse_card(card: ElementRef) -> Option<Anime> {
    let href = html::element_attr(card, "a", "href")?;
    let id = last_segment(&href)?;
    let title = html::element_text(card, "h3.animeTitle")
        .or_else(|| html::element_attr(card, "img", "title"))?;
    let thumbnail = html::element_attr(card, "img", "data-src")
        .or_else(|| html::element_attr(card, "img", "src"))
        .filter(|src| src.starts_with("http"));

    Some(Anime {
        id,
        title,
        thumbnail,
        source: None,
        language: None,
        media_class: MediaClass::Anime,
    })
}

fn parse_episodes(page: &str, anime_id: &str) -> Vec<Episode> {
    let document = html::parse(page);
    let mut episodes = html::parse_items(&document, "a.lEp", |link| {
        let href = link.value().attr("href")?;
        let reference = episode_reference(href)?;
        let number = EPISODE_NUMBER
            .captures(&reference)
            .and_then(|caps| caps[1].parse().ok())?;
        let title = link.text().collect::<String>().trim().to_string();

        Some(Episode {
            reference,
            number,
            title: (!title.is_empty()).then_some(title),
            anime_id: anime_id.to_string(),
        })
    });

    episodes.sort_by(|a, b| a.number.total_cmp(&b.number));
    episodes
}

/// `https://animefire.plus/animes/frieren/3` becomes `frieren/3`.
fn episode_reference(href: &str) -> Option<String> {
    let (_, rest) = href.split_once("/animes/")?;
    let rest = rest.trim_end_matches('/');
    (!rest.is_empty()).then(|| rest.to_string())
}

fn last_segment(href: &str) -> Option<String> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map(String::from)
}
