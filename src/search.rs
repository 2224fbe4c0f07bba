//! Fan-out search across providers and the fluent search builder.
//!
//! A search broadcasts the query to every registered provider at once and
//! merges whatever comes back before a global deadline. Slow or failing
//! providers never hold back the others: when the deadline fires the
//! coordinator stops waiting, records a timeout for every provider still
//! pending, and abandons their tasks.
//!
//! # Execution Strategies
//!
//! - [`flatten()`](SearchBuilder::flatten) - wait for every provider or the deadline
//! - [`flatten_eager()`](SearchBuilder::flatten_eager) - return shortly after the first
//!   non-empty answer (for searches that merge backend classes)
//! - [`group()`](SearchBuilder::group) - per-provider outcomes, for diagnostics
//! - [`from_provider()`](SearchBuilder::from_provider) - one explicit provider
//!
//! # Examples
//!
//! ```rust
//! use eizo::prelude::*;
//! # use eizo::error::Result;
//!
//! # async fn example() -> Result<()> {
//! let providers = Providers::with_defaults();
//!
//! let results = providers
//!     .search("frieren")
//!     .limit(20)
//!     .mode(TranslationMode::Dub)
//!     .flatten()
//!     .await?
//!     .dedupe_by_title()
//!     .sort_by_query_relevance("frieren");
//! # Ok(())
//! # }
//! ```

use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    error::{Error, ProviderFailure, Result},
    provider::{Providers, wrap_provider_error},
    types::{Anime, MediaClass, SearchParams, TranslationMode},
};

/// Fluent search builder holding a reference to a [`Providers`] registry.
pub struct SearchBuilder<'a> {
    providers: &'a Providers,
    params: SearchParams,
    class: Option<MediaClass>,
    timeout: Option<Duration>,
}

impl<'a> SearchBuilder<'a> {
    pub(crate) fn new(providers: &'a Providers, query: impl Into<String>) -> Self {
        Self {
            providers,
            params: SearchParams {
                query: query.into(),
                ..Default::default()
            },
            class: None,
            timeout: None,
        }
    }

    /// Maximum number of results each provider returns.
    pub fn limit(mut self, limit: usize) -> Self {
        self.params.limit = Some(limit);
        self
    }

    pub fn mode(mut self, mode: TranslationMode) -> Self {
        self.params.mode = mode;
        self
    }

    /// Restricts the broadcast to providers of one backend class.
    pub fn class(mut self, class: MediaClass) -> Self {
        self.class = Some(class);
        self
    }

    /// Overrides the configured global deadline for this search.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Searches every provider and merges the results.
    ///
    /// Results are tagged with their provider and appended in arrival order;
    /// nothing is sorted or deduplicated.
    ///
    /// # Errors
    ///
    /// * [`Error::AggregateSearchFailed`] - nothing found and at least one provider failed
    /// * [`Error::NoResults`] - every provider answered with nothing
    pub async fn flatten(self) -> Result<Vec<Anime>> {
        let options = FanOut {
            deadline: self.timeout.unwrap_or(self.providers.config().search.timeout()),
            grace: None,
        };
        merge(self.run(options).await)
    }

    /// Like [`flatten()`](Self::flatten), but returns early.
    ///
    /// The first non-empty answer arms a short grace window once; the search
    /// returns when every provider answered, the grace window elapsed, or the
    /// multi-class deadline fired, whichever comes first.
    pub async fn flatten_eager(self) -> Result<Vec<Anime>> {
        let search = &self.providers.config().search;
        let options = FanOut {
            deadline: self.timeout.unwrap_or(search.multi_class_timeout()),
            grace: Some(search.early_return_grace()),
        };
        merge(self.run(options).await)
    }

    /// Per-provider outcomes in arrival order, under the global deadline.
    pub async fn group(self) -> Vec<(String, Result<Vec<Anime>>)> {
        let options = FanOut {
            deadline: self.timeout.unwrap_or(self.providers.config().search.timeout()),
            grace: None,
        };
        self.run(options)
            .await
            .into_iter()
            .map(|outcome| (outcome.provider.to_string(), outcome.result))
            .collect()
    }

    /// Searches one provider directly, without a deadline.
    ///
    /// # Errors
    ///
    /// * [`Error::ProviderNotFound`] - no provider carries `tag`
    /// * [`Error::Source`] - the provider failed; the error names it
    pub async fn from_provider(self, tag: &str) -> Result<Vec<Anime>> {
        let provider = self
            .providers
            .get(tag)
            .ok_or_else(|| Error::ProviderNotFound(tag.to_string()))?;

        let mut results = provider
            .search(self.params)
            .await
            .map_err(|e| wrap_provider_error(provider.name(), e))?;

        for entry in &mut results {
            entry.tag(provider.name(), provider.language());
        }
        Ok(results)
    }

    /// Returns the accumulated parameters without searching.
    pub fn build(self) -> SearchParams {
        self.params
    }

    async fn run(self, options: FanOut) -> Vec<Outcome> {
        let class = self.class;
        let providers = self
            .providers
            .iter()
            .filter(|p| class.is_none_or(|c| p.media_class() == c));

        let mut tasks = JoinSet::new();
        let mut pending = BTreeMap::new();
        for (index, provider) in providers.enumerate() {
            pending.insert(index, provider.name());
            let provider = provider.clone();
            let params = self.params.clone();
            tasks.spawn(async move {
                let result = AssertUnwindSafe(provider.search(params))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(Error::Other("search task panicked".to_string())));
                (index, provider.language(), result)
            });
        }

        collect(tasks, pending, options).await
    }
}

/// Deadline and optional early-return window of one fan-out.
#[derive(Debug, Clone, Copy)]
struct FanOut {
    deadline: Duration,
    grace: Option<Duration>,
}

/// One provider's outcome as seen by the collector.
struct Outcome {
    provider: &'static str,
    result: Result<Vec<Anime>>,
}

type TaskOutput = (usize, &'static str, Result<Vec<Anime>>);

/// Drains provider tasks until all reported, the grace window elapsed, or the
/// deadline fired.
///
/// This loop is the only writer of the outcome list. Tasks still running
/// when it returns are aborted with the set, so their output never surfaces.
async fn collect(
    mut tasks: JoinSet<TaskOutput>,
    mut pending: BTreeMap<usize, &'static str>,
    options: FanOut,
) -> Vec<Outcome> {
    let started = Instant::now();
    let deadline = started + options.deadline;
    let mut grace_at: Option<Instant> = None;
    let mut outcomes = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let grace = async move {
            match grace_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            Some(joined) = tasks.join_next() => {
                let (index, language, mut result) = match joined {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(error = %e, "Provider task did not complete");
                        continue;
                    }
                };
                let Some(provider) = pending.remove(&index) else {
                    continue;
                };

                match &mut result {
                    Ok(entries) => {
                        debug!(
                            provider,
                            results = entries.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Provider answered"
                        );
                        for entry in entries.iter_mut() {
                            entry.tag(provider, language);
                        }
                        if !entries.is_empty() && grace_at.is_none() {
                            if let Some(grace) = options.grace {
                                grace_at = Some(Instant::now() + grace);
                            }
                        }
                    }
                    Err(e) => warn!(provider, error = %e, "Provider search failed"),
                }
                outcomes.push(Outcome { provider, result });
            }
            _ = grace => {
                debug!(pending = pending.len(), "Early-return window elapsed");
                break;
            }
            _ = tokio::time::sleep_until(deadline) => {
                for &provider in pending.values() {
                    warn!(provider, timeout_ms = options.deadline.as_millis() as u64, "Provider search timed out");
                    outcomes.push(Outcome {
                        provider,
                        result: Err(Error::Other(format!(
                            "search timed out after {:?}",
                            options.deadline
                        ))),
                    });
                }
                break;
            }
        }
    }

    outcomes
}

/// Merges outcomes into one list or the aggregate error.
fn merge(outcomes: Vec<Outcome>) -> Result<Vec<Anime>> {
    let mut results = Vec::new();
    let mut failures = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(mut entries) => results.append(&mut entries),
            Err(e) => failures.push(ProviderFailure::new(outcome.provider, e.to_string())),
        }
    }

    if !results.is_empty() {
        info!(results = results.len(), failed = failures.len(), "Search complete");
        return Ok(results);
    }
    if failures.is_empty() {
        Err(Error::NoResults)
    } else {
        Err(Error::AggregateSearchFailed(failures))
    }
}

/// Post-processing helpers for merged search results.
///
/// The coordinator never reorders or deduplicates; these are opt-in.
pub trait SearchResultExt {
    /// Removes entries whose title (case-insensitive) was already seen,
    /// keeping the first occurrence.
    fn dedupe_by_title(self) -> Self;

    /// Sorts by how well the title matches `query`, best first.
    fn sort_by_query_relevance(self, query: &str) -> Self;

    /// Keeps only entries tagged with `language`.
    fn from_language(self, language: &str) -> Self;
}

impl SearchResultExt for Vec<Anime> {
    fn dedupe_by_title(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.retain(|entry| seen.insert(entry.title.to_lowercase()));
        self
    }

    fn sort_by_query_relevance(mut self, query: &str) -> Self {
        let query = query.to_lowercase();
        // Stable sort keeps arrival order among equal scores
        self.sort_by(|a, b| {
            title_relevance(&b.title, &query)
                .cmp(&title_relevance(&a.title, &query))
                .then_with(|| a.title.len().cmp(&b.title.len()))
        });
        self
    }

    fn from_language(mut self, language: &str) -> Self {
        self.retain(|entry| entry.language.as_deref() == Some(language));
        self
    }
}

fn title_relevance(title: &str, query: &str) -> u32 {
    let title = title.to_lowercase();
    if title == query {
        return 100;
    }
    if title.starts_with(query) {
        return 75;
    }
    if title.contains(query) {
        return 50;
    }

    let query_words: Vec<&str> = query.split_whitespace().collect();
    if query_words.is_empty() {
        return 0;
    }
    let matched = query_words
        .iter()
        .filter(|word| title.split_whitespace().any(|t| t.contains(*word)))
        .count() as u32;
    matched * 25 / query_words.len() as u32
}
