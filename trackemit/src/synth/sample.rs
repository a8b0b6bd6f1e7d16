//! Emitted samples.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::Position;
use crate::path::EntityProperties;

/// Why a sample was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleCategory {
    /// First sample of a job, at elapsed time 0.
    Start,
    /// Cadence tick while moving along a segment.
    Edge,
    /// Arrival at an intermediate vertex.
    Vertex,
    /// Stationary tick while dwelling at a vertex.
    Wait,
    /// Arrival at the final vertex.
    Finish,
}

impl SampleCategory {
    /// Name used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleCategory::Start => "start",
            SampleCategory::Edge => "edge",
            SampleCategory::Vertex => "vertex",
            SampleCategory::Wait => "wait",
            SampleCategory::Finish => "finish",
        }
    }
}

impl std::fmt::Display for SampleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One timestamped position report.
///
/// Samples are built once by the integrator and never modified. Entity
/// properties are shared between all samples of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Recorded position (jittered if jitter is enabled).
    pub position: Position,

    /// Seconds since the start of the job.
    pub elapsed: f64,

    /// Speed in m/s.
    pub speed: f64,

    /// Bearing from the previous emitted sample in degrees, if the
    /// displacement was large enough to be meaningful.
    pub bearing: Option<f64>,

    /// Why the sample exists.
    pub category: SampleCategory,

    /// Position of the sample in its job (0-based).
    pub sequence: usize,

    /// Vertex the sample sits on, for non-edge samples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex: Option<usize>,

    /// Sync payload attached at this vertex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<Value>,

    /// Position before jitter was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_position: Option<Position>,

    /// Static entity properties.
    #[serde(skip)]
    pub properties: Arc<EntityProperties>,
}

impl Sample {
    /// Position without jitter.
    pub fn true_position(&self) -> Position {
        self.true_position.unwrap_or(self.position)
    }

    /// The `mark` carried by the sync payload, if any.
    pub fn mark(&self) -> Option<&str> {
        self.sync.as_ref()?.get("mark")?.as_str()
    }

    /// Flat property map for GeoJSON output: entity properties, then the
    /// sync payload, then the sample's own fields. Later layers win on name
    /// clashes, so a payload can never relabel `speed` or `category`.
    pub fn feature_properties(&self) -> EntityProperties {
        let mut props = (*self.properties).clone();
        match &self.sync {
            Some(Value::Object(sync)) => {
                for (k, v) in sync {
                    props.insert(k.clone(), v.clone());
                }
            }
            Some(sync) => {
                props.insert("sync".into(), sync.clone());
            }
            None => {}
        }
        props.insert("elapsed".into(), Value::from(self.elapsed));
        props.insert("speed".into(), Value::from(self.speed));
        props.insert(
            "bearing".into(),
            self.bearing.map(Value::from).unwrap_or(Value::Null),
        );
        props.insert("category".into(), Value::from(self.category.as_str()));
        props.insert("sequence".into(), Value::from(self.sequence));
        if let Some(vertex) = self.vertex {
            props.insert("vertex".into(), Value::from(vertex));
        }
        if let Some(true_position) = &self.true_position {
            props.insert("truePosition".into(), Value::from(true_position.coordinates()));
        }
        props
    }

    /// The sample as a GeoJSON `Point` feature.
    pub fn to_feature(&self) -> Value {
        serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": self.position.coordinates(),
            },
            "properties": self.feature_properties(),
        })
    }
}
