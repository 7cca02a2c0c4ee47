//! Named reference systems and conversion between any pair of them.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
    Coordinate, bd09_to_gcj02, bd09_to_wgs84, gcj02_to_bd09, gcj02_to_wgs84, wgs84_to_bd09,
    wgs84_to_gcj02,
};

/// A geodetic reference system understood by [`convert`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CoordinateSystem {
    /// GPS datum.
    Wgs84,
    /// Regulated offset datum.
    Gcj02,
    /// Secondary offset datum layered on GCJ02.
    Bd09,
}

/// Converts a coordinate between reference systems.
///
/// Same-system conversion returns the input untouched.
#[must_use]
pub fn convert(coord: Coordinate, from: CoordinateSystem, to: CoordinateSystem) -> Coordinate {
    use CoordinateSystem::{Bd09, Gcj02, Wgs84};

    let Coordinate {
        longitude: lng,
        latitude: lat,
    } = coord;

    match (from, to) {
        (Wgs84, Wgs84) | (Gcj02, Gcj02) | (Bd09, Bd09) => coord,
        (Wgs84, Gcj02) => wgs84_to_gcj02(lng, lat),
        (Gcj02, Wgs84) => gcj02_to_wgs84(lng, lat),
        (Gcj02, Bd09) => gcj02_to_bd09(lng, lat),
        (Bd09, Gcj02) => bd09_to_gcj02(lng, lat),
        (Wgs84, Bd09) => wgs84_to_bd09(lng, lat),
        (Bd09, Wgs84) => bd09_to_wgs84(lng, lat),
    }
}

/// Converts every coordinate in `coords`, preserving order.
#[must_use]
pub fn batch_convert(
    coords: &[Coordinate],
    from: CoordinateSystem,
    to: CoordinateSystem,
) -> Vec<Coordinate> {
    coords.iter().map(|c| convert(*c, from, to)).collect()
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn same_system_is_identity() {
        let c = Coordinate::new(121.5, 25.0);
        for system in CoordinateSystem::iter() {
            assert_eq!(convert(c, system, system), c);
        }
    }

    #[test]
    fn matches_direct_functions() {
        let c = Coordinate::new(121.5654, 25.033);
        assert_eq!(
            convert(c, CoordinateSystem::Wgs84, CoordinateSystem::Bd09),
            wgs84_to_bd09(c.longitude, c.latitude)
        );
        assert_eq!(
            convert(c, CoordinateSystem::Gcj02, CoordinateSystem::Bd09),
            gcj02_to_bd09(c.longitude, c.latitude)
        );
    }

    #[test]
    fn batch_preserves_order() {
        let coords = [
            Coordinate::new(121.5, 25.0),
            Coordinate::new(-87.6, 41.8),
            Coordinate::new(116.4, 39.9),
        ];
        let out = batch_convert(&coords, CoordinateSystem::Wgs84, CoordinateSystem::Bd09);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], coords[1]);
        assert!((out[0].longitude - coords[0].longitude).abs() > 1e-4);
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("WGS84".parse::<CoordinateSystem>().ok(), Some(CoordinateSystem::Wgs84));
        assert_eq!("bd09".parse::<CoordinateSystem>().ok(), Some(CoordinateSystem::Bd09));
        assert_eq!(CoordinateSystem::Gcj02.to_string(), "gcj02");
    }
}
