#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding data types shared by the resolver, providers and the CLI.
//!
//! Raw provider output is a [`GeocodeMatch`]. The resolver scores matches
//! into [`ScoredResult`]s, and the caller-facing answer is a
//! [`ResolveOutcome`] carrying a [`Resolution`] in both WGS84 and BD09.

pub mod config;

pub use config::{ConfigError, ResolverConfig};
pub use coord_map_transform::Coordinate;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Provider name used for interpolated estimates.
pub const INTERPOLATION_PROVIDER: &str = "interpolation";

/// Structured address fields reported by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDetails {
    pub house_number: Option<String>,
    pub road: Option<String>,
    pub neighbourhood: Option<String>,
    pub city_district: Option<String>,
    pub city: Option<String>,
}

impl AddressDetails {
    /// Number of tracked fields.
    pub const FIELD_COUNT: usize = 5;

    /// How many of the tracked fields are present.
    #[must_use]
    pub fn present_count(&self) -> usize {
        [
            &self.house_number,
            &self.road,
            &self.neighbourhood,
            &self.city_district,
            &self.city,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }
}

/// How specific a match is.
///
/// Ordered from most to least precise, so `a < b` means `a` is finer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Precision {
    /// A specific building or house number.
    HouseNumber,
    /// A road or road segment.
    Road,
    /// A neighbourhood, district or city.
    Area,
    /// Nothing recognisable.
    Unknown,
}

/// A raw match returned by a provider, before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeMatch {
    /// WGS84 position.
    pub coordinate: Coordinate,
    /// Provider's display string for the match.
    pub display_address: String,
    /// Provider that produced the match.
    pub provider_name: String,
    /// Object class, e.g. `building`, `highway`, `place`.
    pub raw_class: Option<String>,
    /// Object type, e.g. `house`, `road`, `residential`.
    pub raw_type: Option<String>,
    /// Whether the provider says the match carries a house number.
    pub has_house_number: Option<bool>,
    /// Provider importance in `[0, 1]`.
    pub importance: Option<f64>,
    #[serde(default)]
    pub details: AddressDetails,
}

impl GeocodeMatch {
    /// Precision tier derived from class, type and structured fields.
    #[must_use]
    pub fn precision(&self) -> Precision {
        let class = self.raw_class.as_deref();
        let kind = self.raw_type.as_deref();

        if class == Some("building")
            || kind == Some("house")
            || self.has_house_number == Some(true)
            || self.details.house_number.is_some()
        {
            Precision::HouseNumber
        } else if class == Some("highway") || kind == Some("road") || self.details.road.is_some() {
            Precision::Road
        } else if matches!(class, Some("place" | "boundary"))
            || self.details.neighbourhood.is_some()
            || self.details.city_district.is_some()
            || self.details.city.is_some()
        {
            Precision::Area
        } else {
            Precision::Unknown
        }
    }
}

/// A match after local scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResult {
    #[serde(rename = "match")]
    pub matched: GeocodeMatch,
    /// Locally computed trust score in `[0, 1]`.
    pub confidence: f64,
    /// Precision tier of the match.
    pub precision: Precision,
    /// Rank of the variant that produced the match (0 = most specific).
    pub precision_rank: usize,
    /// Query string that produced the match.
    pub variant: String,
    /// Raw heuristic score used for ranking.
    pub score: f64,
    /// Whether the coordinate was interpolated rather than matched.
    pub estimated: bool,
}

/// A coarser known position used to estimate an unmatched address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePoint {
    pub coordinate: Coordinate,
    pub source_address: String,
    pub confidence: f64,
}

/// Caller-facing resolution of an address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Address as the caller typed it.
    pub input_address: String,
    /// Display string of the match (or the input for estimates).
    pub display_address: String,
    /// GPS datum position.
    pub wgs84: Coordinate,
    /// Secondary offset datum position.
    pub bd09: Coordinate,
    pub confidence: f64,
    /// Provider name, or [`INTERPOLATION_PROVIDER`].
    pub source: String,
    pub estimated: bool,
    pub precision: Precision,
    pub precision_rank: usize,
    pub variant: String,
}

/// Result of resolving an address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolveOutcome {
    /// A provider confirmed the position.
    Found(Resolution),
    /// The position was interpolated from coarser references.
    Estimated(Resolution),
    /// Nothing usable was found.
    NotFound {
        /// Coarser queries the caller could try instead.
        suggestions: Vec<String>,
    },
    /// The resolution was canceled before it finished.
    Canceled,
}

impl ResolveOutcome {
    /// The resolution, if one was produced.
    #[must_use]
    pub const fn resolution(&self) -> Option<&Resolution> {
        match self {
            Self::Found(r) | Self::Estimated(r) => Some(r),
            Self::NotFound { .. } | Self::Canceled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(class: Option<&str>, kind: Option<&str>) -> GeocodeMatch {
        GeocodeMatch {
            coordinate: Coordinate::new(121.5, 25.0),
            display_address: "somewhere".to_string(),
            provider_name: "test".to_string(),
            raw_class: class.map(ToString::to_string),
            raw_type: kind.map(ToString::to_string),
            has_house_number: None,
            importance: None,
            details: AddressDetails::default(),
        }
    }

    #[test]
    fn precision_tiers() {
        assert_eq!(sample(Some("building"), None).precision(), Precision::HouseNumber);
        assert_eq!(sample(Some("place"), Some("house")).precision(), Precision::HouseNumber);
        assert_eq!(sample(Some("highway"), Some("secondary")).precision(), Precision::Road);
        assert_eq!(sample(Some("boundary"), Some("administrative")).precision(), Precision::Area);
        assert_eq!(sample(Some("amenity"), Some("cafe")).precision(), Precision::Unknown);
    }

    #[test]
    fn house_number_detail_wins() {
        let mut m = sample(Some("shop"), Some("convenience"));
        m.details.house_number = Some("100".to_string());
        assert_eq!(m.precision(), Precision::HouseNumber);
    }

    #[test]
    fn precision_orders_finest_first() {
        assert!(Precision::HouseNumber < Precision::Road);
        assert!(Precision::Road < Precision::Area);
        assert!(Precision::Area < Precision::Unknown);
    }

    #[test]
    fn present_count() {
        let details = AddressDetails {
            road: Some("北宜路".to_string()),
            city: Some("新北市".to_string()),
            ..AddressDetails::default()
        };
        assert_eq!(details.present_count(), 2);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let text = toml::to_string(&ResolveOutcome::NotFound {
            suggestions: vec!["新北市".to_string()],
        })
        .unwrap();
        assert!(text.contains("status = \"not_found\""));
    }
}
