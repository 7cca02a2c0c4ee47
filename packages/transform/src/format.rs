//! Human-readable coordinate renderings.

use strum_macros::{AsRefStr, Display, EnumString};

/// Which axis a single coordinate value belongs to.
///
/// Determines the hemisphere letter used by [`to_degree_minute_second`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Axis {
    /// North/south.
    #[strum(serialize = "lat", serialize = "latitude")]
    Latitude,
    /// East/west.
    #[strum(serialize = "lng", serialize = "longitude")]
    Longitude,
}

/// Renders a coordinate value with a fixed number of decimal places.
#[must_use]
pub fn format_coordinate(value: f64, precision: usize) -> String {
    format!("{value:.precision$}")
}

/// Renders a coordinate value as degrees, minutes and seconds with a
/// hemisphere letter, e.g. `25°2'0.00"N`.
#[must_use]
pub fn to_degree_minute_second(value: f64, axis: Axis) -> String {
    let abs = value.abs();
    let degrees = abs.floor();
    let minutes = ((abs - degrees) * 60.0).floor();
    let seconds = ((abs - degrees) * 60.0 - minutes) * 60.0;

    let direction = match (axis, value >= 0.0) {
        (Axis::Latitude, true) => 'N',
        (Axis::Latitude, false) => 'S',
        (Axis::Longitude, true) => 'E',
        (Axis::Longitude, false) => 'W',
    };

    format!("{degrees}°{minutes}'{seconds:.2}\"{direction}")
}

/// Renders a distance in meters as `N 米` below one kilometer and
/// `N.NN 公里` above.
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} 米", meters.round())
    } else {
        format!("{:.2} 公里", meters / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_precision() {
        assert_eq!(format_coordinate(121.565_432_1, 6), "121.565432");
        assert_eq!(format_coordinate(25.0, 2), "25.00");
    }

    #[test]
    fn dms_hemispheres() {
        assert_eq!(to_degree_minute_second(25.5, Axis::Latitude), "25°30'0.00\"N");
        assert_eq!(to_degree_minute_second(-25.5, Axis::Latitude), "25°30'0.00\"S");
        assert_eq!(to_degree_minute_second(121.25, Axis::Longitude), "121°15'0.00\"E");
        assert_eq!(to_degree_minute_second(-0.25, Axis::Longitude), "0°15'0.00\"W");
    }

    #[test]
    fn distance_units() {
        assert_eq!(format_distance(12.4), "12 米");
        assert_eq!(format_distance(2346.0), "2.35 公里");
    }

    #[test]
    fn axis_from_short_names() {
        assert_eq!("lat".parse::<Axis>().ok(), Some(Axis::Latitude));
        assert_eq!("longitude".parse::<Axis>().ok(), Some(Axis::Longitude));
    }
}
