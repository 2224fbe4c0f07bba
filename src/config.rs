//! Tunables for the search coordinator and the stream resolver.
//!
//! Nothing time- or ranking-related is baked into the algorithms; every knob
//! lives here with a default. Durations are stored as milliseconds so they map
//! cleanly onto TOML and environment variables.
//!
//! Configuration can be built in code:
//!
//! ```rust
//! use eizo::config::{ConfigBuilder, SearchConfigBuilder};
//!
//! let config = ConfigBuilder::default()
//!     .search(
//!         SearchConfigBuilder::default()
//!             .timeout_ms(5_000u64)
//!             .build()
//!             .unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//! assert_eq!(config.search.timeout().as_secs(), 5);
//! ```
//!
//! or loaded from a TOML file merged with `EIZO_`-prefixed environment
//! variables (`EIZO_RESOLVER__GRACE_MS=1500`), see [`load_config`].

use derive_builder::Builder;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::resolve::PriorityTable;

/// Domains whose links are preferred, most trusted first.
pub const DEFAULT_PRIORITY_DOMAINS: &[&str] = &[
    "fast4speed.rsvp",
    "sharepoint.com",
    "wixmp.com",
    "allanime.pro",
    "mp4upload.com",
];

/// Quality labels from highest to lowest.
pub const DEFAULT_QUALITY_LADDER: &[&str] = &["1080p", "720p", "480p", "360p"];

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Builder)]
#[builder(default, setter(into))]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    /// Rejects values that would make the algorithms degenerate.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.resolver.validate()
    }
}

/// Base URL overrides for the built-in providers, e.g. for mirrors.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Builder)]
#[builder(default, setter(into, strip_option))]
pub struct ProvidersConfig {
    #[serde(default)]
    pub allanime_url: Option<String>,
    #[serde(default)]
    pub animefire_url: Option<String>,
}

/// Fan-out search deadlines.
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[builder(default, setter(into))]
pub struct SearchConfig {
    /// Global deadline for a search across one backend class
    #[serde(default = "default_search_timeout_ms")]
    pub timeout_ms: u64,

    /// Global deadline for a search merging several backend classes
    #[serde(default = "default_multi_class_timeout_ms")]
    pub multi_class_timeout_ms: u64,

    /// Grace window armed by the first non-empty result of an eager search
    #[serde(default = "default_early_return_grace_ms")]
    pub early_return_grace_ms: u64,
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn multi_class_timeout(&self) -> Duration {
        Duration::from_millis(self.multi_class_timeout_ms)
    }

    pub fn early_return_grace(&self) -> Duration {
        Duration::from_millis(self.early_return_grace_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 || self.multi_class_timeout_ms == 0 {
            return Err(Error::config("search timeouts must be greater than zero"));
        }
        if self.early_return_grace_ms >= self.multi_class_timeout_ms {
            return Err(Error::config(
                "early_return_grace_ms must be shorter than multi_class_timeout_ms",
            ));
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_search_timeout_ms(),
            multi_class_timeout_ms: default_multi_class_timeout_ms(),
            early_return_grace_ms: default_early_return_grace_ms(),
        }
    }
}

fn default_search_timeout_ms() -> u64 {
    15_000
}

fn default_multi_class_timeout_ms() -> u64 {
    6_000
}

fn default_early_return_grace_ms() -> u64 {
    800
}

/// Candidate race tunables.
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[builder(default, setter(into))]
pub struct ResolverConfig {
    /// How long to wait for an urgent top-priority link before draining
    #[serde(default = "default_resolver_grace_ms")]
    pub grace_ms: u64,

    /// Overall wait, measured from the start of the call
    #[serde(default = "default_resolver_timeout_ms")]
    pub overall_timeout_ms: u64,

    /// One candidate dispatch per interval
    #[serde(default = "default_rate_gate_interval_ms")]
    pub rate_gate_interval_ms: u64,

    /// Number of leading priority domains that qualify for the urgent cell
    #[serde(default = "default_urgent_depth")]
    pub urgent_depth: usize,

    #[serde(default = "default_priority_domains")]
    pub priority_domains: Vec<String>,

    #[serde(default = "default_quality_ladder")]
    pub quality_ladder: Vec<String>,
}

impl ResolverConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }

    pub fn rate_gate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_gate_interval_ms)
    }

    pub fn priority_table(&self) -> PriorityTable {
        PriorityTable::new(self.priority_domains.clone())
    }

    fn validate(&self) -> Result<()> {
        if self.overall_timeout_ms == 0 {
            return Err(Error::config("overall_timeout_ms must be greater than zero"));
        }
        if self.grace_ms >= self.overall_timeout_ms {
            return Err(Error::config(
                "resolver grace_ms must be shorter than overall_timeout_ms",
            ));
        }
        if self.quality_ladder.is_empty() {
            return Err(Error::config("quality_ladder must not be empty"));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            grace_ms: default_resolver_grace_ms(),
            overall_timeout_ms: default_resolver_timeout_ms(),
            rate_gate_interval_ms: default_rate_gate_interval_ms(),
            urgent_depth: default_urgent_depth(),
            priority_domains: default_priority_domains(),
            quality_ladder: default_quality_ladder(),
        }
    }
}

fn default_resolver_grace_ms() -> u64 {
    2_000
}

fn default_resolver_timeout_ms() -> u64 {
    10_000
}

fn default_rate_gate_interval_ms() -> u64 {
    50
}

fn default_urgent_depth() -> usize {
    3
}

fn default_priority_domains() -> Vec<String> {
    DEFAULT_PRIORITY_DOMAINS.iter().map(|d| d.to_string()).collect()
}

fn default_quality_ladder() -> Vec<String> {
    DEFAULT_QUALITY_LADDER.iter().map(|q| q.to_string()).collect()
}

/// Loads configuration from a TOML file with `EIZO_` environment overrides.
///
/// Nested keys are separated by a double underscore, e.g.
/// `EIZO_SEARCH__TIMEOUT_MS=20000`.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(Error::config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("EIZO_").split("__"))
        .extract()
        .map_err(|e| Error::config(e.to_string()))?;

    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML string.
pub fn load_config_from_str(toml_str: &str) -> Result<Config> {
    let config: Config = Figment::new()
        .merge(Toml::string(toml_str))
        .extract()
        .map_err(|e| Error::config(e.to_string()))?;

    config.validate()?;
    Ok(config)
}
