//! Path vertices and the validated path feature.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::error::PathError;
use crate::geo::Position;

/// Static properties of the moving entity (callsign, registration, ...).
///
/// Passed through untouched and shared by every sample of a job.
pub type EntityProperties = Map<String, Value>;

/// One vertex of a path, with its optional per-vertex constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Position of the vertex.
    pub position: Position,
    /// Target speed at the vertex in m/s.
    pub speed: Option<f64>,
    /// Target altitude at the vertex in meters.
    pub altitude: Option<f64>,
    /// Dwell time at the vertex in seconds.
    pub pause: Option<f64>,
    /// One-shot payload to attach to the sample at this vertex.
    pub sync: Option<Value>,
}

impl Vertex {
    fn at(position: Position) -> Self {
        Self {
            position,
            speed: None,
            altitude: None,
            pause: None,
            sync: None,
        }
    }
}

/// A validated path: ordered vertices plus entity properties.
///
/// Immutable once built. Construct with [`PathFeature::builder`] or parse
/// GeoJSON with [`PathFeature::from_geojson`].
#[derive(Debug, Clone)]
pub struct PathFeature {
    vertices: Vec<Vertex>,
    properties: Arc<EntityProperties>,
}

impl PathFeature {
    /// Start building a path from its positions.
    pub fn builder(positions: Vec<Position>) -> PathBuilder {
        PathBuilder::new(positions)
    }

    /// The path vertices in order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always false for a built path (at least two vertices).
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex positions in order.
    pub fn positions(&self) -> Vec<Position> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Entity properties shared by all samples.
    pub fn properties(&self) -> &Arc<EntityProperties> {
        &self.properties
    }

    /// Sparse target speeds, one slot per vertex.
    pub fn speeds(&self) -> Vec<Option<f64>> {
        self.vertices.iter().map(|v| v.speed).collect()
    }

    /// Sparse target altitudes, one slot per vertex.
    ///
    /// An explicit altitude attribute wins over the coordinate's own altitude.
    pub fn altitudes(&self) -> Vec<Option<f64>> {
        self.vertices
            .iter()
            .map(|v| v.altitude.or(v.position.alt))
            .collect()
    }

    /// Sparse dwell times, one slot per vertex.
    pub fn pauses(&self) -> Vec<Option<f64>> {
        self.vertices.iter().map(|v| v.pause).collect()
    }
}

/// Builder for [`PathFeature`]. All validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    positions: Vec<Position>,
    speeds: Vec<(usize, f64)>,
    altitudes: Vec<(usize, f64)>,
    pauses: Vec<(usize, f64)>,
    syncs: Vec<(usize, Value)>,
    properties: EntityProperties,
}

impl PathBuilder {
    /// Create a builder for the given positions.
    pub fn new(positions: Vec<Position>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    /// Set the target speed (m/s) at a vertex.
    pub fn speed(mut self, index: usize, value: f64) -> Self {
        self.speeds.push((index, value));
        self
    }

    /// Set the target altitude (m) at a vertex.
    pub fn altitude(mut self, index: usize, value: f64) -> Self {
        self.altitudes.push((index, value));
        self
    }

    /// Set the dwell time (s) at a vertex.
    pub fn pause(mut self, index: usize, value: f64) -> Self {
        self.pauses.push((index, value));
        self
    }

    /// Attach a one-shot sync payload to a vertex.
    pub fn sync(mut self, index: usize, payload: Value) -> Self {
        self.syncs.push((index, payload));
        self
    }

    /// Add a pass-through entity property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Replace all entity properties.
    pub fn properties(mut self, properties: EntityProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Validate and build the path.
    pub fn build(self) -> Result<PathFeature, PathError> {
        let len = self.positions.len();
        if len < 2 {
            return Err(PathError::TooFewPositions(len));
        }

        for (index, position) in self.positions.iter().enumerate() {
            if !position.is_valid() {
                return Err(PathError::InvalidCoordinate {
                    index,
                    reason: format!("{} is not a valid lon/lat position", position),
                });
            }
        }

        let mut vertices: Vec<Vertex> = self.positions.into_iter().map(Vertex::at).collect();

        for (index, value) in self.speeds {
            check_slot("speedsAtVertices", index, len, value, true)?;
            vertices[index].speed = Some(value);
        }
        for (index, value) in self.altitudes {
            check_slot("altsAtVertices", index, len, value, false)?;
            vertices[index].altitude = Some(value);
        }
        for (index, value) in self.pauses {
            check_slot("pausesAtVertices", index, len, value, true)?;
            vertices[index].pause = Some(value);
        }
        for (index, payload) in self.syncs {
            if index >= len {
                return Err(PathError::IndexOutOfRange {
                    attribute: "syncAtVertices",
                    index,
                    len,
                });
            }
            if vertices[index].sync.is_some() {
                return Err(PathError::DuplicateSync(index));
            }
            vertices[index].sync = Some(payload);
        }

        Ok(PathFeature {
            vertices,
            properties: Arc::new(self.properties),
        })
    }
}

fn check_slot(
    attribute: &'static str,
    index: usize,
    len: usize,
    value: f64,
    non_negative: bool,
) -> Result<(), PathError> {
    if index >= len {
        return Err(PathError::IndexOutOfRange {
            attribute,
            index,
            len,
        });
    }
    if !value.is_finite() || (non_negative && value < 0.0) {
        return Err(PathError::InvalidValue {
            attribute,
            index,
            value,
        });
    }
    Ok(())
}
