//! Reference points and probe queries for the interpolation fallback.

use coord_map_address::AddressStructure;
use coord_map_geocoder_models::{Precision, ReferencePoint, ScoredResult};

/// Confidence assigned to road probe hits.
pub const ROAD_PROBE_CONFIDENCE: f64 = 0.6;

/// Most nearby-landmark probes issued for one address.
pub const MAX_NEARBY_PROBES: usize = 8;

const ROAD_PROBE_SUFFIXES: &[&str] = &["起點", "終點", "中段"];

/// Chains common enough to exist in almost every district.
const NEARBY_LANDMARKS: &[&str] = &["7-11", "全家", "萊爾富", "麥當勞", "星巴克"];

/// Whether a result lies on the target's road.
///
/// Both the display address (with `臺` folded to `台`) and the query that
/// produced the result are checked.
#[must_use]
pub fn is_same_road(target: &AddressStructure, result: &ScoredResult) -> bool {
    let Some(road) = target.road.as_deref() else {
        return false;
    };
    let road = road.replace('臺', "台");
    let display = result.matched.display_address.replace('臺', "台");
    display.contains(&road) || result.variant.replace('臺', "台").contains(&road)
}

/// Turns same-road results at road or house precision into references.
#[must_use]
pub fn collect_references(target: &AddressStructure, results: &[ScoredResult]) -> Vec<ReferencePoint> {
    results
        .iter()
        .filter(|r| matches!(r.precision, Precision::HouseNumber | Precision::Road))
        .filter(|r| is_same_road(target, r))
        .map(|r| ReferencePoint {
            coordinate: r.matched.coordinate,
            source_address: r.matched.display_address.clone(),
            confidence: r.confidence,
        })
        .collect()
}

/// Queries locating the start, end and middle of the target's road.
#[must_use]
pub fn road_probe_queries(target: &AddressStructure) -> Vec<String> {
    let Some(road) = target.road_without_section() else {
        return Vec::new();
    };
    ROAD_PROBE_SUFFIXES
        .iter()
        .map(|suffix| format!("{road}{suffix}"))
        .collect()
}

/// Queries for places near the target, at most [`MAX_NEARBY_PROBES`].
#[must_use]
pub fn nearby_probe_queries(target: &AddressStructure) -> Vec<String> {
    let (Some(city), Some(district)) = (target.city.as_deref(), target.district.as_deref()) else {
        return Vec::new();
    };
    let road = target.road.as_deref().unwrap_or_default();

    let mut queries = Vec::new();
    if let (Some(_), Some(road_level)) = (&target.section, &target.road_level) {
        queries.push(road_level.clone());
    }
    if !road.is_empty() {
        queries.push(format!("{city}{district}{road}"));
    }
    queries.push(format!("{city}{district}"));

    for landmark in NEARBY_LANDMARKS {
        queries.push(format!("{city}{district}{landmark}"));
        if !road.is_empty() {
            queries.push(format!("{city}{district}{road}{landmark}"));
        }
    }

    queries.truncate(MAX_NEARBY_PROBES);
    queries
}
