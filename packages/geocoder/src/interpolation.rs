//! Position estimates for addresses no provider matched exactly.
//!
//! Estimates are built from coarser reference points on the same road (or
//! a nearby landmark) and are always labelled as estimated. Their
//! confidence stays below [`crate::scoring::HOUSE_LEVEL_CONFIDENCE_FLOOR`].

use std::f64::consts::{FRAC_PI_2, TAU};

use coord_map_address::{AddressStructure, InterpolationKind};
use coord_map_geocoder_models::{
    AddressDetails, Coordinate, GeocodeMatch, INTERPOLATION_PROVIDER, Precision, ReferencePoint,
    ScoredResult,
};
use sha2::{Digest, Sha256};

/// Offset from a single reference (~11 m).
const SINGLE_REFERENCE_OFFSET: f64 = 0.0001;
/// Jitter around a midpoint (~5.5 m).
const MIDPOINT_JITTER: f64 = 0.00005;
const ALLEY_STEP: f64 = 0.00003;
const LANE_STEP: f64 = 0.00002;
const SUB_STREET_BIAS_CAP: f64 = 0.0003;

const STREET_CONFIDENCE: f64 = 0.75;
const NEARBY_CONFIDENCE: f64 = 0.65;

/// Where the reference points came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateContext {
    /// References lie on the target's road.
    StreetInterpolation,
    /// A single reference near the target (a landmark or district probe).
    NearbyReference,
}

/// Estimates a position for `target` from `references`.
///
/// Returns `None` without references or when the target has no numeric
/// house number.
#[must_use]
pub fn estimate(
    target: &AddressStructure,
    references: &[ReferencePoint],
    context: EstimateContext,
) -> Option<ScoredResult> {
    let house = target.house_number_value()?;

    let (mut position, confidence) = match references {
        [] => return None,
        [only] => {
            let angle = f64::from(house % 4) * FRAC_PI_2;
            let confidence = match context {
                EstimateContext::StreetInterpolation => STREET_CONFIDENCE,
                EstimateContext::NearbyReference => NEARBY_CONFIDENCE,
            };
            (offset(only.coordinate, SINGLE_REFERENCE_OFFSET, angle), confidence)
        }
        _ => {
            let mut ranked: Vec<&ReferencePoint> = references.iter().collect();
            ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
            let (a, b) = (ranked[0].coordinate, ranked[1].coordinate);
            let midpoint = Coordinate::new(
                f64::midpoint(a.longitude, b.longitude),
                f64::midpoint(a.latitude, b.latitude),
            );
            (
                offset(midpoint, MIDPOINT_JITTER, seeded_angle(&target.original)),
                STREET_CONFIDENCE,
            )
        }
    };

    if let Some(alley) = target.alley_value() {
        position.latitude += (f64::from(alley) * ALLEY_STEP).min(SUB_STREET_BIAS_CAP);
    }
    if let Some(lane) = target.lane_value() {
        position.longitude += (f64::from(lane) * LANE_STEP).min(SUB_STREET_BIAS_CAP);
    }

    let kind = target
        .interpolation_kind()
        .unwrap_or(InterpolationKind::Street);

    log::debug!(
        "Estimated {:?} from {} reference(s) as {kind}",
        target.original,
        references.len()
    );

    Some(ScoredResult {
        matched: GeocodeMatch {
            coordinate: position,
            display_address: target.original.clone(),
            provider_name: INTERPOLATION_PROVIDER.to_string(),
            raw_class: None,
            raw_type: Some(kind.to_string()),
            has_house_number: Some(true),
            importance: None,
            details: AddressDetails {
                house_number: target.house_number.clone(),
                road: target.road.clone(),
                neighbourhood: None,
                city_district: target.district.clone(),
                city: target.city.clone(),
            },
        },
        confidence,
        precision: Precision::HouseNumber,
        precision_rank: 0,
        variant: target.original.clone(),
        score: 0.0,
        estimated: true,
    })
}

fn offset(origin: Coordinate, distance: f64, angle: f64) -> Coordinate {
    Coordinate::new(
        distance.mul_add(angle.sin(), origin.longitude),
        distance.mul_add(angle.cos(), origin.latitude),
    )
}

/// Angle in `[0, 2π)` derived from the address text.
fn seeded_angle(address: &str) -> f64 {
    let digest = Sha256::digest(address.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);

    #[allow(clippy::cast_precision_loss)]
    let fraction = u64::from_be_bytes(seed) as f64 / u64::MAX as f64;
    (fraction * TAU) % TAU
}
