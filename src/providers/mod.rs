//! Provider implementations with conditional compilation support.
//!
//! Each provider sits behind its own feature flag so minimal builds only
//! carry the backends they need:
//!
//! - `provider-allanime` - Enables the AllAnime provider
//! - `provider-animefire` - Enables the AnimeFire provider
//! - `all-providers` - Enables every provider (default)
//!
//! ```bash
//! cargo build --no-default-features --features provider-animefire
//! ```
//!
//! # Available Providers
//!
//! - [`AllAnimeProvider`] - English GraphQL backend with obfuscated candidate
//!   pages, resolved through [`CandidateResolver`](crate::resolve::CandidateResolver)
//! - [`AnimeFireProvider`] - pt-BR HTML backend with direct video links

#[cfg(feature = "provider-allanime")]
pub mod allanime;

#[cfg(feature = "provider-animefire")]
pub mod animefire;

#[cfg(feature = "provider-allanime")]
pub use allanime::AllAnimeProvider;

#[cfg(feature = "provider-animefire")]
pub use animefire::AnimeFireProvider;
