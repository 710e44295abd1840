use serde::{Deserialize, Serialize};
use std::fmt;

/// Scaling factor between whole degrees and the fixed-point wire form.
pub const DEGREE_SCALE: f64 = 1e7;

/// Wire sentinel for a position field that is unchanged since the last
/// successful report. Chosen so it can never collide with a real scaled
/// degree value.
pub const COORD_UNCHANGED: i64 = i64::MIN;

/// Wire sentinel for an unchanged readiness field.
pub const READY_UNCHANGED: i8 = -1;

/// A latitude/longitude pair stored as signed degrees scaled by 10^7.
///
/// The fixed-point form is the only one that goes over the wire or into
/// shared state; floating-point degrees exist only inside distance math
/// and movement interpolation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Coordinate {
    /// Latitude in degrees * 10^7
    pub lat: i64,
    /// Longitude in degrees * 10^7
    pub lon: i64,
}

impl Coordinate {
    pub fn new(lat: i64, lon: i64) -> Self {
        Self { lat, lon }
    }

    /// Build from floating-point degrees, rounding to the nearest
    /// fixed-point unit.
    pub fn from_degrees(lat_deg: f64, lon_deg: f64) -> Self {
        Self {
            lat: (lat_deg * DEGREE_SCALE).round() as i64,
            lon: (lon_deg * DEGREE_SCALE).round() as i64,
        }
    }

    pub fn lat_degrees(&self) -> f64 {
        self.lat as f64 / DEGREE_SCALE
    }

    pub fn lon_degrees(&self) -> f64 {
        self.lon as f64 / DEGREE_SCALE
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.7}, {:.7})", self.lat_degrees(), self.lon_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_round_trip() {
        let c = Coordinate::from_degrees(52.5200066, 13.4049540);
        assert_eq!(c.lat, 525_200_066);
        assert_eq!(c.lon, 134_049_540);
        assert!((c.lat_degrees() - 52.5200066).abs() < 1e-9);
        assert!((c.lon_degrees() - 13.4049540).abs() < 1e-9);
    }

    #[test]
    fn from_degrees_rounds_to_nearest_unit() {
        let c = Coordinate::from_degrees(0.000000049, -0.000000051);
        assert_eq!(c.lat, 0);
        assert_eq!(c.lon, -1);
    }

    #[test]
    fn sentinel_is_outside_coordinate_range() {
        // 90 degrees of latitude scaled by 10^7 is nowhere near i64::MIN.
        let south_pole = Coordinate::from_degrees(-90.0, -180.0);
        assert!(south_pole.lat > COORD_UNCHANGED);
        assert!(south_pole.lon > COORD_UNCHANGED);
    }
}
