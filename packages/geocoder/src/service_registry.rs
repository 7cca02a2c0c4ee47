//! Compile-time registry of geocoding service configurations.
//!
//! Each geocoding provider is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`] and [`enabled_services`]. [`build_providers`] turns
//! service ids into live [`GeocodeProvider`]s.

use std::sync::Arc;

use serde::Deserialize;

use crate::google::GoogleProxyProvider;
use crate::nominatim::NominatimProvider;
use crate::{GeocodeError, GeocodeProvider};

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`, `"google_proxy"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service is used when no providers are configured.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Query order, lower values first.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` geocoder.
    Nominatim(NominatimConfig),
    /// Google Geocoding behind a key-injecting proxy.
    GoogleProxy {
        /// Proxy base URL (e.g., `"http://localhost:3000"`).
        base_url: String,
        /// Requests allowed in flight at once in parallel mode.
        #[serde(default = "default_single")]
        concurrent_requests: usize,
    },
}

/// Nominatim endpoints and politeness settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimConfig {
    /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
    pub base_url: String,
    /// Reverse endpoint.
    #[serde(default)]
    pub reverse_url: String,
    /// Comma-separated ISO country codes to restrict results to.
    #[serde(default)]
    pub country_codes: String,
    /// `accept-language` sent with every request.
    #[serde(default = "default_language")]
    pub accept_language: String,
    /// Results requested per query.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Minimum delay between requests in milliseconds.
    pub rate_limit_ms: u64,
    /// Requests allowed in flight at once in parallel mode.
    #[serde(default = "default_single")]
    pub concurrent_requests: usize,
}

const fn default_true() -> bool {
    true
}

const fn default_single() -> usize {
    1
}

const fn default_limit() -> usize {
    5
}

fn default_language() -> String {
    "zh-TW,zh,en".to_string()
}

impl GeocodingService {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim(NominatimConfig { base_url, .. })
            | ProviderConfig::GoogleProxy { base_url, .. } => base_url,
        }
    }

    /// Builds the live provider for this service.
    #[must_use]
    pub fn build(&self, client: &reqwest::Client) -> Arc<dyn GeocodeProvider> {
        match &self.provider {
            ProviderConfig::Nominatim(config) => Arc::new(NominatimProvider::new(
                client.clone(),
                self.id.as_str(),
                config,
            )),
            ProviderConfig::GoogleProxy {
                base_url,
                concurrent_requests,
            } => Arc::new(GoogleProxyProvider::new(
                client.clone(),
                self.id.as_str(),
                base_url,
                *concurrent_requests,
            )),
        }
    }

    /// The Nominatim client for this service, if it is one. Reverse
    /// lookups go through it directly.
    #[must_use]
    pub fn nominatim(&self, client: &reqwest::Client) -> Option<NominatimProvider> {
        match &self.provider {
            ProviderConfig::Nominatim(config) => Some(NominatimProvider::new(
                client.clone(),
                self.id.as_str(),
                config,
            )),
            ProviderConfig::GoogleProxy { .. } => None,
        }
    }
}

// ── Service files shipped with the crate ───────────────────────────

const SERVICE_FILES: [(&str, &str); 2] = [
    ("nominatim", include_str!("../services/nominatim.toml")),
    ("google_proxy", include_str!("../services/google_proxy.toml")),
];

fn parse_service(file: &str, contents: &str) -> GeocodingService {
    toml::de::from_str(contents)
        .unwrap_or_else(|e| panic!("services/{file}.toml is not a valid geocoding service: {e}"))
}

/// Every compiled-in service, enabled or not, in file order.
///
/// # Panics
///
/// Panics if an embedded service file is malformed. The files ship inside
/// the binary, so this cannot depend on the runtime environment.
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_FILES
        .iter()
        .map(|(file, contents)| parse_service(file, contents))
        .collect()
}

/// Services used when no ids are configured, lowest priority first.
#[must_use]
pub fn enabled_services() -> Vec<GeocodingService> {
    let mut enabled = all_services();
    enabled.retain(|s| s.enabled);
    enabled.sort_by_key(|s| s.priority);
    enabled
}

/// Builds providers for the given service ids, in the given order.
///
/// An empty list selects every enabled service in priority order. Listing
/// a disabled service by id enables it.
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if an id names no known service.
pub fn build_providers(
    client: &reqwest::Client,
    ids: &[String],
) -> Result<Vec<Arc<dyn GeocodeProvider>>, GeocodeError> {
    if ids.is_empty() {
        return Ok(enabled_services().iter().map(|s| s.build(client)).collect());
    }

    let services = all_services();
    ids.iter()
        .map(|id| {
            services
                .iter()
                .find(|s| s.id == *id)
                .map(|s| s.build(client))
                .ok_or_else(|| GeocodeError::Config {
                    message: format!("Unknown geocoding service '{id}'"),
                })
        })
        .collect()
}
