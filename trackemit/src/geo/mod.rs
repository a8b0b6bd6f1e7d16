//! Geometry primitives consumed by the trajectory integrator.
//!
//! The integrator never does spherical trigonometry itself. It asks a
//! [`GeoProvider`] for three things:
//!
//! - great-circle distance between two positions (meters)
//! - initial bearing from one position towards another (degrees)
//! - the destination reached from an origin along a bearing for a distance
//!
//! [`Spherical`] is the default provider (mean-radius sphere, the same model
//! turf.js and most ADS-B tooling use). Callers with an ellipsoidal model or a
//! projected coordinate system can plug in their own implementation.
//!
//! # Example
//!
//! ```ignore
//! use trackemit::geo::{GeoProvider, Position, Spherical};
//!
//! let geo = Spherical;
//! let doha = Position::new(51.6081, 25.2731);
//! let dubai = Position::new(55.3644, 25.2528);
//! let meters = geo.distance(&doha, &dubai);
//! let heading = geo.bearing(&doha, &dubai);
//! ```

mod position;
mod spherical;

pub use position::Position;
pub use spherical::{Spherical, EARTH_RADIUS_M};

/// Great-circle geometry used by synthesis.
///
/// Implementations must be pure: the same inputs always give the same
/// outputs, which keeps synthesis deterministic.
pub trait GeoProvider: Send + Sync {
    /// Distance between two positions in meters. Altitude is ignored.
    fn distance(&self, from: &Position, to: &Position) -> f64;

    /// Initial bearing from `from` towards `to`, in degrees `[0, 360)`.
    fn bearing(&self, from: &Position, to: &Position) -> f64;

    /// Position reached from `origin` after `distance_m` meters along
    /// `bearing_deg`. The origin altitude is carried over unchanged.
    fn destination(&self, origin: &Position, bearing_deg: f64, distance_m: f64) -> Position;
}

impl<T: GeoProvider + ?Sized> GeoProvider for &T {
    fn distance(&self, from: &Position, to: &Position) -> f64 {
        (**self).distance(from, to)
    }

    fn bearing(&self, from: &Position, to: &Position) -> f64 {
        (**self).bearing(from, to)
    }

    fn destination(&self, origin: &Position, bearing_deg: f64, distance_m: f64) -> Position {
        (**self).destination(origin, bearing_deg, distance_m)
    }
}

/// Normalize an angle in degrees to `[0, 360)`.
#[inline]
pub fn normalize_bearing(deg: f64) -> f64 {
    let b = deg % 360.0;
    if b < 0.0 {
        b + 360.0
    } else {
        b
    }
}
