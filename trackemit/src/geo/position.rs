//! Geographic position type.

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// A WGS84 position: longitude and latitude in degrees, optional altitude in
/// meters.
///
/// Serializes as a GeoJSON coordinate array (`[lon, lat]` or
/// `[lon, lat, alt]`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Longitude in degrees (-180 to 180).
    pub lon: f64,
    /// Latitude in degrees (-90 to 90).
    pub lat: f64,
    /// Altitude in meters, when tracked.
    pub alt: Option<f64>,
}

impl Position {
    /// Create a 2D position.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            alt: None,
        }
    }

    /// Create a 3D position.
    pub fn with_alt(lon: f64, lat: f64, alt: f64) -> Self {
        Self {
            lon,
            lat,
            alt: Some(alt),
        }
    }

    /// Same horizontal position with a different altitude.
    pub fn at_alt(self, alt: Option<f64>) -> Self {
        Self { alt, ..self }
    }

    /// Returns true if longitude and latitude are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
            && self.alt.map_or(true, f64::is_finite)
    }

    /// Coordinates as a GeoJSON array.
    pub fn coordinates(&self) -> Vec<f64> {
        match self.alt {
            Some(alt) => vec![self.lon, self.lat, alt],
            None => vec![self.lon, self.lat],
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.alt.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.lon)?;
        seq.serialize_element(&self.lat)?;
        if let Some(alt) = self.alt {
            seq.serialize_element(&alt)?;
        }
        seq.end()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.alt {
            Some(alt) => write!(f, "({:.6}, {:.6}, {:.1}m)", self.lon, self.lat, alt),
            None => write!(f, "({:.6}, {:.6})", self.lon, self.lat),
        }
    }
}
