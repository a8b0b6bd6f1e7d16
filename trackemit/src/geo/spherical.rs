//! Spherical-earth geometry provider.

use super::{normalize_bearing, GeoProvider, Position};

/// Mean earth radius in meters (IUGG), as used by turf.js.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle geometry on a sphere of radius [`EARTH_RADIUS_M`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Spherical;

impl GeoProvider for Spherical {
    fn distance(&self, from: &Position, to: &Position) -> f64 {
        let lat1 = from.lat.to_radians();
        let lat2 = to.lat.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (to.lon - from.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    fn bearing(&self, from: &Position, to: &Position) -> f64 {
        let lat1 = from.lat.to_radians();
        let lat2 = to.lat.to_radians();
        let dlon = (to.lon - from.lon).to_radians();

        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        normalize_bearing(y.atan2(x).to_degrees())
    }

    fn destination(&self, origin: &Position, bearing_deg: f64, distance_m: f64) -> Position {
        let lat1 = origin.lat.to_radians();
        let lon1 = origin.lon.to_radians();
        let brng = bearing_deg.to_radians();
        let delta = distance_m / EARTH_RADIUS_M;

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * brng.cos()).asin();
        let lon2 = lon1
            + (brng.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        // Wrap longitude back into [-180, 180]
        let lon = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;

        Position {
            lon,
            lat: lat2.to_degrees(),
            alt: origin.alt,
        }
    }
}
