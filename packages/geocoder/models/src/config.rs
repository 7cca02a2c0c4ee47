//! Resolver configuration.
//!
//! Every knob has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! providers = ["nominatim"]
//! max_variants = 15
//! inter_request_delay_ms = 1000
//! parallel = false
//! timeout_ms = 10000
//! early_exit_rank = 3
//! parallel_variant_limit = 6
//! reference_probes = true
//! user_agent = "coord-map/0.1 (https://github.com/BSteffaniak/coord-map)"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a [`ResolverConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("Invalid config TOML: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// A value is out of range.
    #[error("Invalid config value: {message}")]
    Invalid {
        /// Which value and why.
        message: String,
    },
}

/// Tuning for one address resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Service ids to query, in priority order. Empty means every enabled
    /// service.
    pub providers: Vec<String>,
    /// Cap on generated query variants.
    pub max_variants: usize,
    /// Pause between consecutive provider calls in sequential mode.
    pub inter_request_delay_ms: u64,
    /// Issue the first variants to every provider concurrently.
    pub parallel: bool,
    /// Per-call timeout.
    pub timeout_ms: u64,
    /// Results from variants ranked below this return immediately when
    /// precise enough. `0` disables early exit.
    pub early_exit_rank: usize,
    /// Number of variants issued concurrently in parallel mode.
    pub parallel_variant_limit: usize,
    /// Whether road and nearby-landmark probes may be issued to find
    /// interpolation references.
    pub reference_probes: bool,
    /// `User-Agent` sent to providers that require one.
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            max_variants: 15,
            inter_request_delay_ms: 1000,
            parallel: false,
            timeout_ms: 10_000,
            early_exit_rank: 3,
            parallel_variant_limit: 6,
            reference_probes: true,
            user_agent: format!(
                "coord-map/{} (https://github.com/BSteffaniak/coord-map)",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl ResolverConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the document does not match the schema
    /// * [`ConfigError::Invalid`] if a value is out of range
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(contents).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Read`] if the file cannot be read
    /// * any error of [`Self::from_toml_str`]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };

        if self.max_variants == 0 {
            return invalid("max_variants must be at least 1");
        }
        if self.timeout_ms == 0 {
            return invalid("timeout_ms must be at least 1");
        }
        if self.parallel && self.parallel_variant_limit == 0 {
            return invalid("parallel_variant_limit must be at least 1 in parallel mode");
        }
        if self.user_agent.trim().is_empty() {
            return invalid("user_agent must not be empty");
        }
        if self.providers.iter().any(|p| p.trim().is_empty()) {
            return invalid("provider ids must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ResolverConfig::from_toml_str("").unwrap();
        assert_eq!(config, ResolverConfig::default());
        assert_eq!(config.max_variants, 15);
        assert_eq!(config.inter_request_delay_ms, 1000);
        assert_eq!(config.early_exit_rank, 3);
        assert!(!config.parallel);
        assert!(config.reference_probes);
    }

    #[test]
    fn overrides_selected_values() {
        let config = ResolverConfig::from_toml_str(
            r#"
            providers = ["nominatim", "google_proxy"]
            parallel = true
            inter_request_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.providers, vec!["nominatim", "google_proxy"]);
        assert!(config.parallel);
        assert_eq!(config.inter_request_delay_ms, 0);
        assert_eq!(config.timeout_ms, 10_000);
    }

    #[test]
    fn rejects_zero_variants() {
        let err = ResolverConfig::from_toml_str("max_variants = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rejects_wrong_types() {
        let err = ResolverConfig::from_toml_str("parallel = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ResolverConfig::from_file(Path::new("/nonexistent/coord-map.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
