//! Great-circle math over fixed-point coordinates.

use cmn_types::Coordinate;

/// Mean earth radius in kilometers (IUGG).
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance in kilometers between two coordinates, via the
/// haversine formula.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.lat_degrees().to_radians();
    let lat_b = b.lat_degrees().to_radians();
    let d_lat = (b.lat_degrees() - a.lat_degrees()).to_radians();
    let d_lon = (b.lon_degrees() - a.lon_degrees()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Total distance of one full job cycle: start to pickup, pickup to drop,
/// drop back to start.
pub fn trip_distance_km(start: Coordinate, pickup: Coordinate, drop: Coordinate) -> f64 {
    distance_km(start, pickup) + distance_km(pickup, drop) + distance_km(drop, start)
}
