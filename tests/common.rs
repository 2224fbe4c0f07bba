//! Common test utilities and constants
//!
//! Shared functionality used across all test modules.

use async_trait::async_trait;
use eizo::error::{Error, Result};
use eizo::prelude::*;
use eizo::types::ResolvedLink;
use std::time::Duration;

#[allow(dead_code)]
pub const TEST_QUERY: &str = "frieren";

/// Installs a test-writer subscriber once; honours `RUST_LOG`.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[allow(dead_code)]
pub fn anime(title: &str) -> Anime {
    Anime {
        id: title.to_lowercase().replace(' ', "-"),
        title: title.to_string(),
        thumbnail: None,
        source: None,
        language: None,
        media_class: MediaClass::Anime,
    }
}

#[allow(dead_code)]
pub enum MockOutcome {
    Results(Vec<Anime>),
    Fail(String),
    Panic,
}

/// In-memory provider with an injectable answer delay.
#[allow(dead_code)]
pub struct MockProvider {
    pub tag: &'static str,
    pub language: &'static str,
    pub class: MediaClass,
    pub delay: Duration,
    pub outcome: MockOutcome,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn answering(tag: &'static str, titles: &[&str]) -> Self {
        Self {
            tag,
            language: "en",
            class: MediaClass::Anime,
            delay: Duration::ZERO,
            outcome: MockOutcome::Results(titles.iter().map(|t| anime(t)).collect()),
        }
    }

    pub fn with_results(tag: &'static str, results: Vec<Anime>) -> Self {
        Self {
            outcome: MockOutcome::Results(results),
            ..Self::answering(tag, &[])
        }
    }

    pub fn failing(tag: &'static str, message: &str) -> Self {
        Self {
            outcome: MockOutcome::Fail(message.to_string()),
            ..Self::answering(tag, &[])
        }
    }

    pub fn panicking(tag: &'static str) -> Self {
        Self {
            outcome: MockOutcome::Panic,
            ..Self::answering(tag, &[])
        }
    }

    pub fn after(mut self, delay_ms: u64) -> Self {
        self.delay = Duration::from_millis(delay_ms);
        self
    }

    pub fn language(mut self, language: &'static str) -> Self {
        self.language = language;
        self
    }

    pub fn class(mut self, class: MediaClass) -> Self {
        self.class = class;
        self
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Other(self.tag)
    }

    fn name(&self) -> &'static str {
        self.tag
    }

    fn language(&self) -> &'static str {
        self.language
    }

    fn media_class(&self) -> MediaClass {
        self.class
    }

    fn base_url(&self) -> &str {
        "https://mock.example"
    }

    async fn search(&self, params: SearchParams) -> Result<Vec<Anime>> {
        tokio::time::sleep(self.delay).await;
        match &self.outcome {
            MockOutcome::Results(results) => {
                let mut results = results.clone();
                if let Some(limit) = params.limit {
                    results.truncate(limit);
                }
                Ok(results)
            }
            MockOutcome::Fail(message) => Err(Error::Other(message.clone())),
            MockOutcome::Panic => panic!("{} exploded", self.tag),
        }
    }

    async fn list_items(&self, locator: &str) -> Result<Vec<Episode>> {
        Ok(vec![Episode {
            reference: "1".to_string(),
            number: 1.0,
            title: None,
            anime_id: locator.to_string(),
        }])
    }

    async fn resolve_stream(
        &self,
        _locator: &str,
        episode: &str,
        _quality: &QualityRequest,
    ) -> Result<ResolvedStream> {
        match &self.outcome {
            MockOutcome::Fail(message) => Err(Error::Other(message.clone())),
            _ => Ok(ResolvedLink::new("720p", format!("https://cdn.mock.example/{episode}.mp4")).into()),
        }
    }
}

/// Registry holding the given providers.
#[allow(dead_code)]
pub fn registry(providers: Vec<MockProvider>) -> Providers {
    let mut registry = Providers::new();
    for provider in providers {
        registry.add(provider);
    }
    registry
}
