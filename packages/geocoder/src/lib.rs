#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address resolution for Taiwanese addresses.
//!
//! Resolves free text to a position in both WGS84 and BD09 using a
//! multi-provider strategy configured via TOML files in `services/`:
//!
//! 1. **Nominatim / OpenStreetMap** (priority 1): free, no API key,
//!    1 req/sec on the public instance.
//! 2. **Google Geocoding proxy** (priority 2, disabled by default): the
//!    key is injected server-side by a pass-through proxy.
//!
//! An address is expanded into query variants (see
//! [`coord_map_address::variants`]), which are tried from most to least
//! specific against the providers in priority order. Matches are scored
//! locally ([`scoring`]); a precise enough match at a high rank returns
//! immediately. When nothing matches at house-number precision,
//! same-road matches become reference points for the
//! [`interpolation`] fallback.
//!
//! Provider failures never abort a search. They are logged and count as
//! "no match" for that query.

pub mod cancel;
pub mod google;
pub mod interpolation;
pub mod nominatim;
pub mod references;
pub mod resolver;
pub mod scoring;
pub mod service_registry;

use async_trait::async_trait;
use coord_map_geocoder_models::{ConfigError, GeocodeMatch, ResolveOutcome, ResolverConfig};
use thiserror::Error;

pub use cancel::CancelToken;
pub use resolver::{GeocodeResolver, Resolved};

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Provider answered with a non-success HTTP status.
    #[error("{provider} returned status {status}")]
    Status {
        /// Provider name.
        provider: String,
        /// HTTP status code.
        status: u16,
    },

    /// Provider did not answer in time.
    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout {
        /// Provider name.
        provider: String,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// Invalid configuration or unknown provider id.
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong.
        message: String,
    },
}

impl From<ConfigError> for GeocodeError {
    fn from(e: ConfigError) -> Self {
        Self::Config {
            message: e.to_string(),
        }
    }
}

/// A geocoding service.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Name reported as the source of this provider's matches.
    fn name(&self) -> &str;

    /// How many queries may be in flight at once in parallel mode.
    fn max_in_flight(&self) -> usize {
        1
    }

    /// Minimum pause before each call in sequential mode, on top of the
    /// resolver's own pacing.
    fn min_delay_ms(&self) -> u64 {
        0
    }

    /// Runs a free-text query.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails, the service answers
    /// with an error, or the response cannot be parsed.
    async fn query(&self, text: &str) -> Result<Vec<GeocodeMatch>, GeocodeError>;
}

/// Resolves an address with the providers named in `config`.
///
/// Builds an HTTP client and the configured providers, then runs a
/// [`GeocodeResolver`]. The outcome carries the position in both WGS84 and
/// BD09.
///
/// # Errors
///
/// * [`GeocodeError::Config`] if `config` is invalid or names an unknown
///   provider
/// * [`GeocodeError::Http`] if the HTTP client cannot be built
/// * the last provider error, if every provider call of the search failed
pub async fn resolve_address(
    text: &str,
    config: &ResolverConfig,
    cancel: &CancelToken,
) -> Result<ResolveOutcome, GeocodeError> {
    config.validate()?;

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()?;
    let providers = service_registry::build_providers(&client, &config.providers)?;

    GeocodeResolver::new(config.clone(), providers)
        .resolve_outcome(text, cancel)
        .await
}
