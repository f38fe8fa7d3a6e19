//! Local-tangent-plane conversions between east/north displacements and geographic
//! coordinates. Coordinates are `geo::Coord` with `x` = longitude and `y` = latitude,
//! both in degrees.
//!
//! The projection is equirectangular about the origin point, which is accurate for
//! balloon drift distances (tens of kilometres) and exactly invertible.

/// mean Earth radius (IUGG), in meters
pub const EARTH_RADIUS: f64 = 6_371_008.8;

/// move `origin` by `east` and `north` meters
pub fn displace(origin: geo::Coord, east: f64, north: f64) -> geo::Coord {
    let latitude = origin.y + (north / EARTH_RADIUS).to_degrees();
    let longitude =
        origin.x + (east / (EARTH_RADIUS * origin.y.to_radians().cos())).to_degrees();

    geo::coord! { x: wrap_longitude(longitude), y: latitude }
}

/// east and north displacement (in meters) that carries `from` onto `to`; inverse of `displace`
pub fn offset(from: geo::Coord, to: geo::Coord) -> (f64, f64) {
    let delta_longitude = wrap_longitude(to.x - from.x);
    let east = EARTH_RADIUS * from.y.to_radians().cos() * delta_longitude.to_radians();
    let north = EARTH_RADIUS * (to.y - from.y).to_radians();
    (east, north)
}

/// compass bearing (degrees clockwise from north) and distance (meters) from `from` to `to`
pub fn bearing_distance(from: geo::Coord, to: geo::Coord) -> (f64, f64) {
    let (east, north) = offset(from, to);
    (
        east.atan2(north).to_degrees().rem_euclid(360.0),
        east.hypot(north),
    )
}

pub fn wrap_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}
