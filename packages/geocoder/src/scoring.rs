//! Local scoring of raw provider matches.
//!
//! Two numbers come out of a match. The raw score only ranks matches of
//! the same query against each other. The confidence is what callers see;
//! its house-number floor sits above every interpolated estimate.

use coord_map_geocoder_models::{AddressDetails, GeocodeMatch, Precision, ScoredResult};

/// Lowest confidence of a house-number match. Interpolated estimates never
/// reach it.
pub const HOUSE_LEVEL_CONFIDENCE_FLOOR: f64 = 0.8;

const LOCAL_MARKERS: &[&str] = &["台灣", "臺灣", "Taiwan"];

/// Whether the display address places the match in Taiwan.
#[must_use]
pub fn is_local(display_address: &str) -> bool {
    LOCAL_MARKERS.iter().any(|m| display_address.contains(m))
}

/// Ranking score of a match. Higher is better.
#[must_use]
pub fn raw_score(m: &GeocodeMatch) -> f64 {
    let mut score = 0.0;

    if is_local(&m.display_address) {
        score += 50.0;
    }

    let class = m.raw_class.as_deref();
    let kind = m.raw_type.as_deref();
    if class == Some("building") || kind == Some("house") {
        score += 30.0;
    } else if class == Some("highway") || kind == Some("road") {
        score += 20.0;
    } else if class == Some("place") {
        score += 15.0;
    }

    score += detail_score(&m.details);
    score += m.importance.unwrap_or(0.0) * 10.0;

    score
}

fn detail_score(details: &AddressDetails) -> f64 {
    [
        (&details.house_number, 25.0),
        (&details.road, 15.0),
        (&details.neighbourhood, 10.0),
        (&details.city_district, 8.0),
        (&details.city, 5.0),
    ]
    .iter()
    .filter(|(field, _)| field.is_some())
    .map(|(_, weight)| weight)
    .sum()
}

/// Caller-facing confidence of a match, in `[0, 1]`.
#[must_use]
pub fn confidence(m: &GeocodeMatch) -> f64 {
    let base = match m.precision() {
        Precision::HouseNumber => HOUSE_LEVEL_CONFIDENCE_FLOOR,
        Precision::Road => 0.6,
        Precision::Area => 0.5,
        Precision::Unknown => 0.4,
    };
    let local = if is_local(&m.display_address) { 0.1 } else { 0.0 };

    #[allow(clippy::cast_precision_loss)]
    let completeness = m.details.present_count() as f64 / AddressDetails::FIELD_COUNT as f64;
    let importance = m.importance.unwrap_or(0.0).clamp(0.0, 1.0);

    (base + local + 0.05 * completeness + 0.05 * importance).clamp(0.0, 1.0)
}

/// Scores one match produced by `variant` at `rank`.
#[must_use]
pub fn score(matched: GeocodeMatch, variant: &str, rank: usize) -> ScoredResult {
    ScoredResult {
        confidence: confidence(&matched),
        precision: matched.precision(),
        score: raw_score(&matched),
        precision_rank: rank,
        variant: variant.to_string(),
        estimated: false,
        matched,
    }
}

/// Scores every match of one query and keeps the best. Ties keep the
/// earlier match.
#[must_use]
pub fn select_best(matches: Vec<GeocodeMatch>, variant: &str, rank: usize) -> Option<ScoredResult> {
    matches
        .into_iter()
        .map(|m| score(m, variant, rank))
        .fold(None, |best: Option<ScoredResult>, candidate| match best {
            Some(b) if b.score >= candidate.score => Some(b),
            _ => Some(candidate),
        })
}
