//! GeoJSON input: a `Feature` with `LineString` geometry.
//!
//! Sparse per-vertex attributes travel in the feature properties:
//!
//! ```json
//! {
//!   "type": "Feature",
//!   "geometry": { "type": "LineString", "coordinates": [[51.60, 25.27], [51.61, 25.27]] },
//!   "properties": {
//!     "callsign": "QTR1",
//!     "speedsAtVertices": [{ "index": 0, "value": 0 }],
//!     "pausesAtVertices": [{ "index": 1, "value": 120 }],
//!     "altsAtVertices":   [{ "index": 1, "value": 300 }],
//!     "syncAtVertices":   [{ "index": 1, "payload": { "mark": "gate" } }]
//!   }
//! }
//! ```
//!
//! Every other property is passed through as an entity property.

use serde::Deserialize;
use serde_json::Value;

use super::error::PathError;
use super::feature::{EntityProperties, PathBuilder, PathFeature};
use crate::geo::Position;

const SPEEDS_KEY: &str = "speedsAtVertices";
const PAUSES_KEY: &str = "pausesAtVertices";
const ALTS_KEY: &str = "altsAtVertices";
const SYNC_KEY: &str = "syncAtVertices";

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(rename = "type")]
    kind: String,
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<EntityProperties>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

/// `{index, value}` pair of a sparse numeric attribute.
#[derive(Debug, Clone, Deserialize)]
struct IndexedValue {
    index: usize,
    value: f64,
}

/// `{index, payload}` pair of a sync marker.
#[derive(Debug, Clone, Deserialize)]
struct IndexedPayload {
    index: usize,
    payload: Value,
}

impl PathFeature {
    /// Parse a GeoJSON feature from text.
    pub fn from_geojson_str(text: &str) -> Result<Self, PathError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_geojson(value)
    }

    /// Parse a GeoJSON feature value.
    pub fn from_geojson(value: Value) -> Result<Self, PathError> {
        let raw: RawFeature = serde_json::from_value(value)?;
        if raw.kind != "Feature" {
            return Err(PathError::NotAFeature(raw.kind));
        }

        let geometry = raw
            .geometry
            .ok_or_else(|| PathError::UnsupportedGeometry("feature has no geometry".to_string()))?;
        if geometry.kind != "LineString" {
            return Err(PathError::UnsupportedGeometry(geometry.kind));
        }

        let positions = parse_coordinates(&geometry.coordinates)?;
        let mut properties = raw.properties.unwrap_or_default();

        let speeds: Vec<IndexedValue> = take_attribute(&mut properties, SPEEDS_KEY)?;
        let pauses: Vec<IndexedValue> = take_attribute(&mut properties, PAUSES_KEY)?;
        let alts: Vec<IndexedValue> = take_attribute(&mut properties, ALTS_KEY)?;
        let syncs: Vec<IndexedPayload> = take_attribute(&mut properties, SYNC_KEY)?;

        let mut builder = PathBuilder::new(positions).properties(properties);
        for s in speeds {
            builder = builder.speed(s.index, s.value);
        }
        for p in pauses {
            builder = builder.pause(p.index, p.value);
        }
        for a in alts {
            builder = builder.altitude(a.index, a.value);
        }
        for m in syncs {
            builder = builder.sync(m.index, m.payload);
        }
        builder.build()
    }
}

fn parse_coordinates(coordinates: &Value) -> Result<Vec<Position>, PathError> {
    let list = coordinates.as_array().ok_or_else(|| {
        PathError::UnsupportedGeometry("LineString coordinates must be an array".to_string())
    })?;

    list.iter()
        .enumerate()
        .map(|(index, coord)| parse_position(index, coord))
        .collect()
}

fn parse_position(index: usize, coord: &Value) -> Result<Position, PathError> {
    let invalid = |reason: &str| PathError::InvalidCoordinate {
        index,
        reason: reason.to_string(),
    };

    let parts = coord
        .as_array()
        .ok_or_else(|| invalid("position must be an array"))?;
    let numbers: Option<Vec<f64>> = parts.iter().map(Value::as_f64).collect();
    let numbers = numbers.ok_or_else(|| invalid("position members must be numbers"))?;

    match numbers.as_slice() {
        [lon, lat] => Ok(Position::new(*lon, *lat)),
        [lon, lat, alt] => Ok(Position::with_alt(*lon, *lat, *alt)),
        _ => Err(invalid("position must have 2 or 3 members")),
    }
}

fn take_attribute<T>(properties: &mut EntityProperties, key: &'static str) -> Result<Vec<T>, PathError>
where
    T: serde::de::DeserializeOwned,
{
    match properties.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value).map_err(|e| PathError::InvalidAttribute {
            attribute: key,
            reason: e.to_string(),
        }),
    }
}
