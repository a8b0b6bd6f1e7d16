//! Path input model.
//!
//! A path is an ordered list of vertices with sparse per-vertex constraints
//! (target speed, target altitude, dwell time, sync marker) and a bag of
//! static entity properties. Paths are validated once, up front, and are
//! immutable afterwards.

mod error;
mod feature;
mod geojson;

pub use error::PathError;
pub use feature::{EntityProperties, PathBuilder, PathFeature, Vertex};
