//! Resolver settings from flags and an optional TOML file.

use std::path::PathBuf;

use clap::Args;
use coord_map_geocoder_models::{ConfigError, ResolverConfig};
use coord_map_transform::system::CoordinateSystem;

/// Flags of `coord_map resolve`. Flags override values from `--config`.
#[derive(Debug, Default, Args)]
pub struct ResolveOptions {
    /// TOML file with resolver settings
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Geocoding service id to query; repeat for several, in priority order
    #[arg(long = "provider")]
    pub providers: Vec<String>,
    /// Maximum number of query variants
    #[arg(long)]
    pub max_variants: Option<usize>,
    /// Pause between provider calls in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
    /// Per-call timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Query the first variants concurrently
    #[arg(long)]
    pub parallel: bool,
    /// Return immediately on a precise match ranked below this
    #[arg(long)]
    pub early_exit_rank: Option<usize>,
    /// Never issue road or nearby-landmark probes
    #[arg(long)]
    pub no_probes: bool,
}

impl ResolveOptions {
    /// Builds the resolver configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be loaded or the
    /// final values are out of range.
    pub fn into_config(self) -> Result<ResolverConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ResolverConfig::from_file(path)?,
            None => ResolverConfig::default(),
        };

        if !self.providers.is_empty() {
            config.providers = self.providers;
        }
        if let Some(max_variants) = self.max_variants {
            config.max_variants = max_variants;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.inter_request_delay_ms = delay_ms;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(rank) = self.early_exit_rank {
            config.early_exit_rank = rank;
        }
        if self.parallel {
            config.parallel = true;
        }
        if self.no_probes {
            config.reference_probes = false;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parses `wgs84`, `gcj02` or `bd09`, ignoring case.
///
/// # Errors
///
/// Returns a message naming the accepted values.
pub fn parse_system(s: &str) -> Result<CoordinateSystem, String> {
    s.parse()
        .map_err(|_| format!("unknown coordinate system {s:?} (expected wgs84, gcj02 or bd09)"))
}
