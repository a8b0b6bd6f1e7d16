//! Trajectory synthesis.
//!
//! Turns a [`PathFeature`] into a time-ordered list of [`Sample`]s:
//!
//! 1. sparse per-vertex speeds and altitudes are propagated into dense tables
//! 2. optionally, corners are smoothed and the tables re-expressed against
//!    the new vertices
//! 3. the integrator walks the path on a fixed cadence, handling dwells and
//!    attaching sync markers
//!
//! Synthesis is a pure function of its inputs (jitter aside, and jitter is
//! reproducible with a seed), so batches run in parallel on the rayon pool.
//!
//! # Example
//!
//! ```ignore
//! use trackemit::path::PathFeature;
//! use trackemit::synth::{SynthOptions, Synthesizer};
//!
//! let path = PathFeature::from_geojson_str(&text)?;
//! let options = SynthOptions::default().with_rate(10.0).with_vertices(true);
//! let synthesis = Synthesizer::default().synthesize(&path, &options)?;
//!
//! for sample in &synthesis.samples {
//!     println!("{:>8.1}s {} {}", sample.elapsed, sample.category, sample.position);
//! }
//! ```

mod attributes;
mod dwell;
mod error;
mod integrator;
mod options;
mod sample;
mod smoothing;
mod sync;

pub use attributes::{propagate, AttributeTables, GROUND_LEVEL};
pub use dwell::{plan_dwell, DwellPlan};
pub use error::SynthError;
pub use integrator::{should_emit, Integrator, Trajectory, MIN_BEARING_DISTANCE_M};
pub use options::{DwellAltitude, SynthOptions, DEFAULT_MIN_SPEED, DEFAULT_RATE, DEFAULT_SPEED};
pub use sample::{Sample, SampleCategory};
pub use smoothing::{
    ArcSmoother, NoSmoothing, PathSmoother, SmoothedPath, DEFAULT_ARC_POINTS,
    DEFAULT_MIN_TURN_DEG, DEFAULT_RADIUS_M,
};
pub use sync::SyncArena;

use std::sync::Arc;

use rayon::prelude::*;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::geo::{GeoProvider, Position, Spherical};
use crate::path::{EntityProperties, PathFeature};

/// Result of synthesizing one path.
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Vertex list actually integrated (smoothed if smoothing was on).
    pub path: Vec<Position>,
    /// Emitted samples, in time order.
    pub samples: Vec<Sample>,
    /// Time from start to arrival at the final vertex (s).
    pub duration: f64,
    /// Static entity properties shared by every sample.
    pub properties: Arc<EntityProperties>,
}

impl Synthesis {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Marks carried by sync payloads, in emission order.
    pub fn marks(&self) -> Vec<&str> {
        let mut marks: Vec<&str> = Vec::new();
        for mark in self.samples.iter().filter_map(Sample::mark) {
            if !marks.contains(&mark) {
                marks.push(mark);
            }
        }
        marks
    }

    /// Elapsed time of the first sample carrying `mark`.
    pub fn relative_time_of(&self, mark: &str) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.mark() == Some(mark))
            .map(|s| s.elapsed)
    }

    /// The integrated path as a GeoJSON `LineString` feature.
    pub fn path_feature(&self) -> Value {
        let coordinates: Vec<Vec<f64>> = self.path.iter().map(Position::coordinates).collect();
        json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates,
            },
            "properties": Value::Object((*self.properties).clone()),
        })
    }

    /// Path and samples as a GeoJSON `FeatureCollection`.
    pub fn to_feature_collection(&self) -> Value {
        let mut features = Vec::with_capacity(self.samples.len() + 1);
        features.push(self.path_feature());
        features.extend(self.samples.iter().map(Sample::to_feature));
        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

/// Synthesis entry point: a geometry provider plus a smoothing strategy.
pub struct Synthesizer<G: GeoProvider = Spherical> {
    geo: G,
    smoother: Arc<dyn PathSmoother>,
}

impl Default for Synthesizer<Spherical> {
    fn default() -> Self {
        Self::new(Spherical)
    }
}

impl<G: GeoProvider> Synthesizer<G> {
    /// Create a synthesizer using `geo` and the default arc smoother.
    pub fn new(geo: G) -> Self {
        Self {
            geo,
            smoother: Arc::new(ArcSmoother::default()),
        }
    }

    /// Replace the smoother used when `SynthOptions::smooth` is set.
    pub fn with_smoother(mut self, smoother: impl PathSmoother + 'static) -> Self {
        self.smoother = Arc::new(smoother);
        self
    }

    /// The geometry provider.
    pub fn geo(&self) -> &G {
        &self.geo
    }

    /// Synthesize one path.
    pub fn synthesize(
        &self,
        path: &PathFeature,
        options: &SynthOptions,
    ) -> Result<Synthesis, SynthError> {
        options.validate()?;

        let n = path.len();
        let tables =
            AttributeTables::build(n, &path.speeds(), &path.altitudes(), &path.pauses(), options);
        let mut sync = SyncArena::new(path.vertices().iter().map(|v| v.sync.clone()).collect());

        let (positions, tables) = if options.smooth {
            let smoothed = self.smoother.smooth(&self.geo, &path.positions(), &tables)?;
            smoothed.validate(n)?;

            let len = smoothed.positions.len();
            debug!(
                vertices = n,
                smoothed_vertices = len,
                "Path smoothed"
            );
            sync = sync.reindex(&smoothed.index_map, len);
            let tables = AttributeTables::build(
                len,
                &smoothed.speeds,
                &smoothed.altitudes,
                &smoothed.pauses,
                options,
            );
            (smoothed.positions, tables)
        } else {
            (path.positions(), tables)
        };

        let trajectory = Integrator::new(&self.geo, &positions, &tables, options)
            .run(Arc::clone(path.properties()), &mut sync);

        if sync.pending() > 0 {
            debug!(
                pending = sync.pending(),
                "Sync markers left unconsumed"
            );
        }

        let path_out = positions
            .iter()
            .enumerate()
            .map(|(i, p)| p.at_alt(options.altitude.then(|| tables.altitude(i))))
            .collect();

        Ok(Synthesis {
            path: path_out,
            samples: trajectory.samples,
            duration: trajectory.duration,
            properties: Arc::clone(path.properties()),
        })
    }

    /// Synthesize many paths in parallel. Results keep the input order.
    pub fn synthesize_batch(
        &self,
        jobs: &[(PathFeature, SynthOptions)],
    ) -> Vec<Result<Synthesis, SynthError>> {
        let results: Vec<_> = jobs
            .par_iter()
            .map(|(path, options)| self.synthesize(path, options))
            .collect();

        info!(
            jobs = jobs.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "Batch synthesis complete"
        );
        results
    }
}

/// Synthesize one path with the default spherical geometry.
pub fn synthesize(path: &PathFeature, options: &SynthOptions) -> Result<Synthesis, SynthError> {
    Synthesizer::default().synthesize(path, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_path() -> PathFeature {
        let a = Position::new(51.6, 25.27);
        let b = Spherical.destination(&a, 45.0, 900.0);
        let c = Spherical.destination(&b, 135.0, 900.0);
        PathFeature::builder(vec![a, b, c])
            .sync(1, json!({"mark": "gate", "gate": "C4"}))
            .property("callsign", "QTR7")
            .build()
            .unwrap()
    }

    #[test]
    fn test_synthesize_defaults() {
        let synthesis = synthesize(&straight_path(), &SynthOptions::default()).unwrap();
        assert!(!synthesis.is_empty());
        assert_eq!(synthesis.samples[0].category, SampleCategory::Start);
        assert_eq!(
            synthesis.samples.last().unwrap().category,
            SampleCategory::Finish
        );
        assert!((synthesis.duration - 180.0).abs() < 1e-3);
        assert_eq!(synthesis.path.len(), 3);
    }

    #[test]
    fn test_marks_and_relative_time() {
        let synthesis = synthesize(&straight_path(), &SynthOptions::default()).unwrap();
        assert_eq!(synthesis.marks(), vec!["gate"]);
        let t = synthesis.relative_time_of("gate").unwrap();
        assert!((t - 90.0).abs() < 1e-3);
        assert_eq!(synthesis.relative_time_of("runway"), None);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let result = synthesize(&straight_path(), &SynthOptions::default().with_rate(-1.0));
        assert!(matches!(result, Err(SynthError::InvalidOption { name: "rate", .. })));
    }

    #[test]
    fn test_smoothing_keeps_marker_and_endpoints() {
        let path = straight_path();
        let options = SynthOptions::default().with_smooth(true).with_rate(5.0);
        let synthesis = synthesize(&path, &options).unwrap();

        assert_eq!(synthesis.path.len(), 2 + DEFAULT_ARC_POINTS);
        assert_eq!(synthesis.path[0], path.positions()[0]);
        assert_eq!(synthesis.path.last(), path.positions().last());
        assert_eq!(synthesis.marks(), vec!["gate"]);
        // Cutting the corner shortens the trip
        assert!(synthesis.duration < 180.0);
    }

    #[test]
    fn test_custom_smoother() {
        let synthesizer = Synthesizer::default().with_smoother(NoSmoothing);
        let options = SynthOptions::default().with_smooth(true);
        let synthesis = synthesizer.synthesize(&straight_path(), &options).unwrap();
        assert_eq!(synthesis.path.len(), 3);
    }

    #[test]
    fn test_feature_collection_shape() {
        let synthesis = synthesize(&straight_path(), &SynthOptions::default()).unwrap();
        let fc = synthesis.to_feature_collection();
        let features = fc["features"].as_array().unwrap();
        assert_eq!(features.len(), synthesis.len() + 1);
        assert_eq!(features[0]["geometry"]["type"], json!("LineString"));
        assert_eq!(features[0]["properties"]["callsign"], json!("QTR7"));
        assert_eq!(features[1]["properties"]["callsign"], json!("QTR7"));
    }

    #[test]
    fn test_altitude_on_output_path() {
        let a = Position::with_alt(0.0, 0.0, 10.0);
        let b = Spherical.destination(&Position::new(0.0, 0.0), 0.0, 500.0);
        let path = PathFeature::builder(vec![a, b]).altitude(1, 110.0).build().unwrap();
        let synthesis = synthesize(&path, &SynthOptions::default().with_altitude(true)).unwrap();
        assert_eq!(synthesis.path[0].alt, Some(10.0));
        assert_eq!(synthesis.path[1].alt, Some(110.0));
    }

    #[test]
    fn test_batch_preserves_order() {
        let fast = SynthOptions::default().with_speed(30.0);
        let slow = SynthOptions::default().with_speed(5.0);
        let bad = SynthOptions::default().with_rate(0.0);
        let jobs = vec![
            (straight_path(), fast),
            (straight_path(), slow),
            (straight_path(), bad),
        ];
        let results = Synthesizer::default().synthesize_batch(&jobs);
        assert_eq!(results.len(), 3);
        let d0 = results[0].as_ref().unwrap().duration;
        let d1 = results[1].as_ref().unwrap().duration;
        assert!(d0 < d1);
        assert!(results[2].is_err());
    }
}
