//! Errors raised while reading or validating a path feature.

use thiserror::Error;

/// Errors that make a path unusable for synthesis.
///
/// Every variant is detected before integration starts, so a failed path
/// never produces partial output.
#[derive(Debug, Error)]
pub enum PathError {
    /// Input is not valid JSON or does not have the expected shape.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Top-level object is not a GeoJSON Feature.
    #[error("Expected a GeoJSON Feature, found '{0}'")]
    NotAFeature(String),

    /// Feature has no geometry or a geometry other than LineString.
    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    /// A path needs at least two positions.
    #[error("Path has {0} position(s), at least 2 are required")]
    TooFewPositions(usize),

    /// A coordinate is malformed or out of range.
    #[error("Invalid coordinate at vertex {index}: {reason}")]
    InvalidCoordinate { index: usize, reason: String },

    /// A sparse attribute references a vertex that does not exist.
    #[error("{attribute}: index {index} is out of range for {len} vertices")]
    IndexOutOfRange {
        attribute: &'static str,
        index: usize,
        len: usize,
    },

    /// A sparse attribute value is not acceptable (negative, NaN, ...).
    #[error("{attribute}: invalid value {value} at vertex {index}")]
    InvalidValue {
        attribute: &'static str,
        index: usize,
        value: f64,
    },

    /// More than one sync marker targets the same vertex.
    #[error("Vertex {0} has more than one sync marker")]
    DuplicateSync(usize),

    /// A sparse attribute list could not be decoded.
    #[error("{attribute}: {reason}")]
    InvalidAttribute {
        attribute: &'static str,
        reason: String,
    },
}
