//! Candidate racing: turn several indirect hosting pages into one playable link.
//!
//! Some providers never hand out media URLs directly. Instead they return a
//! handful of candidate endpoints, each a page that must be fetched and
//! picked apart by a provider-specific [`Extractor`]. [`CandidateResolver`]
//! races those candidates and returns the first good answer:
//!
//! 1. Every candidate gets its own task. Page fetches are paced by a
//!    per-call [`RateGate`](crate::net::RateGate) in candidate order;
//!    [`Candidate::Direct`] links skip the fetch and the gate.
//! 2. A task whose page yields a link on one of the top priority domains
//!    offers it to a single-slot urgent cell. The resolver waits a short grace
//!    period for that cell and returns its link straight away.
//! 3. Otherwise results are drained as they complete. The first link on any
//!    priority domain wins; failing that, the first usable link seen is kept
//!    as a fallback until every task finished or the overall timeout fired.
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use eizo::net::HttpClient;
//! use eizo::resolve::{CandidateResolver, PriorityTable};
//! use eizo::types::QualityRequest;
//!
//! # async fn example() -> eizo::Result<()> {
//! let extractor = |raw: &str| -> BTreeMap<String, String> {
//!     BTreeMap::from([("hls".to_string(), raw.trim().to_string())])
//! };
//! let resolver = CandidateResolver::new(Arc::new(HttpClient::new("demo")), Arc::new(extractor));
//! let stream = resolver
//!     .resolve(
//!         ["https://a.example/page", "https://b.example/page"],
//!         &QualityRequest::Best,
//!         &PriorityTable::default(),
//!     )
//!     .await?;
//! println!("{} ({})", stream.url, stream.metadata.quality);
//! # Ok(())
//! # }
//! ```

mod priority;
mod quality;

pub use priority::PriorityTable;
pub use quality::{PRIORITY_SUFFIX, display_label, flag_priority_links, select_quality};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::net::RateGate;
use crate::types::{QualityRequest, ResolvedLink, ResolvedStream};

/// One entry in a candidate race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Hosting page that must be fetched and run through the extractor
    Page(String),
    /// Media URL that is already playable
    Direct { label: String, url: String },
}

impl Candidate {
    pub fn direct(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Direct {
            label: label.into(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Page(url) | Self::Direct { url, .. } => url,
        }
    }
}

impl From<String> for Candidate {
    fn from(url: String) -> Self {
        Self::Page(url)
    }
}

impl From<&str> for Candidate {
    fn from(url: &str) -> Self {
        Self::Page(url.to_string())
    }
}

/// Fetches the raw body of a candidate endpoint.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Turns a fetched candidate page into quality label to URL pairs.
///
/// Implemented for any `Fn(&str) -> BTreeMap<String, String>`.
pub trait Extractor: Send + Sync {
    fn extract(&self, raw: &str) -> BTreeMap<String, String>;
}

impl<F> Extractor for F
where
    F: Fn(&str) -> BTreeMap<String, String> + Send + Sync,
{
    fn extract(&self, raw: &str) -> BTreeMap<String, String> {
        self(raw)
    }
}

/// Races candidate endpoints for one provider.
pub struct CandidateResolver {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn Extractor>,
    config: ResolverConfig,
}

impl CandidateResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            fetcher,
            extractor,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves `candidates` to a single stream.
    ///
    /// Plain strings are treated as [`Candidate::Page`]s. Pages take rate
    /// gate slots in the order given.
    ///
    /// The returned metadata carries `priority = High` when the link came
    /// from a priority domain.
    ///
    /// # Errors
    ///
    /// * [`Error::NoUsableLink`] - every candidate finished (or there were
    ///   none) without a usable link
    /// * [`Error::ResolutionTimeout`] - the overall timeout fired with nothing
    ///   to fall back on
    pub async fn resolve(
        &self,
        candidates: impl IntoIterator<Item = impl Into<Candidate>>,
        quality: &QualityRequest,
        table: &PriorityTable,
    ) -> Result<ResolvedStream> {
        let candidates: Vec<Candidate> = candidates.into_iter().map(Into::into).collect();
        if candidates.is_empty() {
            return Err(Error::NoUsableLink);
        }

        let started = Instant::now();
        let deadline = started + self.config.overall_timeout();
        let grace_deadline = (started + self.config.grace()).min(deadline);

        let (urgent_tx, mut urgent_rx) = mpsc::channel::<ResolvedLink>(1);
        let shared = CandidateTask {
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            gate: Arc::new(RateGate::new(self.config.rate_gate_interval())),
            urgent: urgent_tx,
            table: Arc::new(table.clone()),
            quality: Arc::new(quality.clone()),
            ladder: self.config.quality_ladder.clone().into(),
            urgent_depth: self.config.urgent_depth,
        };

        debug!(candidates = candidates.len(), "Racing stream candidates");

        // Dropping the set on return aborts whatever is still running
        let mut tasks = JoinSet::new();
        let mut next_slot = 0;
        for (index, candidate) in candidates.into_iter().enumerate() {
            let slot = next_slot;
            if matches!(candidate, Candidate::Page(_)) {
                next_slot += 1;
            }
            let task = shared.clone();
            tasks.spawn(async move { (index, task.run(candidate, slot).await) });
        }
        // Only tasks hold senders now, so the cell closes once they all finish
        drop(shared);

        if let Ok(Some(link)) = tokio::time::timeout_at(grace_deadline, urgent_rx.recv()).await {
            info!(
                quality = %link.quality,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Urgent priority link resolved"
            );
            return Ok(link.with_priority().into());
        }

        let mut fallback: Option<ResolvedLink> = None;
        let timed_out = loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break false,
                    Some(Ok((index, Ok(links)))) => {
                        let Some((label, url)) =
                            select_quality(&links, quality, &self.config.quality_ladder)
                        else {
                            debug!(candidate = index, "Candidate yielded no links");
                            continue;
                        };

                        let score = table.score(&url);
                        let link = ResolvedLink::new(display_label(&label), url);
                        if score > 0 {
                            info!(
                                candidate = index,
                                score,
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                "Priority link resolved"
                            );
                            return Ok(link.with_priority().into());
                        }
                        if fallback.is_none() {
                            fallback = Some(link);
                        }
                    }
                    Some(Ok((index, Err(e)))) => {
                        debug!(candidate = index, error = %e, "Candidate failed");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Candidate task did not complete");
                    }
                },
                _ = tokio::time::sleep_until(deadline) => break true,
            }
        };

        match fallback {
            Some(link) => {
                debug!(quality = %link.quality, timed_out, "Using first non-priority link");
                Ok(link.into())
            }
            None if timed_out => Err(Error::ResolutionTimeout(self.config.overall_timeout())),
            None => Err(Error::NoUsableLink),
        }
    }
}

/// Everything a candidate task needs, cheap to clone per task.
#[derive(Clone)]
struct CandidateTask {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn Extractor>,
    gate: Arc<RateGate>,
    urgent: mpsc::Sender<ResolvedLink>,
    table: Arc<PriorityTable>,
    quality: Arc<QualityRequest>,
    ladder: Arc<[String]>,
    urgent_depth: usize,
}

impl CandidateTask {
    async fn run(self, candidate: Candidate, slot: usize) -> Result<BTreeMap<String, String>> {
        let links = match candidate {
            Candidate::Page(url) => {
                self.gate.admit(slot).await;
                let raw = self.fetcher.fetch(&url).await?;
                self.extractor.extract(&raw)
            }
            Candidate::Direct { label, url } => BTreeMap::from([(label, url)]),
        };
        let links = flag_priority_links(links, &self.table);

        let urgent: BTreeMap<String, String> = links
            .iter()
            .filter(|(_, url)| self.table.is_urgent(url, self.urgent_depth))
            .map(|(label, url)| (label.clone(), url.clone()))
            .collect();

        if let Some((label, url)) = select_quality(&urgent, &self.quality, &self.ladder) {
            // Keep-first: a full cell silently drops later offers
            let _ = self
                .urgent
                .try_send(ResolvedLink::new(display_label(&label), url));
        }

        Ok(links)
    }
}
