//! Attribute propagation: sparse per-vertex scalars to dense tables.
//!
//! Speed and altitude constraints are usually given at a handful of vertices
//! (gate, runway threshold, top of climb). The integrator needs a value at
//! every vertex, so the gaps are filled:
//!
//! - an undefined first slot takes `max(default, floor)`
//! - a gap between two anchors is interpolated linearly by vertex index
//! - a gap with no later anchor holds the last anchor value
//! - filled values are clamped to the floor; anchors are kept as given
//!
//! Dwell times are not interpolated: a pause belongs to one vertex only.

use super::options::SynthOptions;

/// Ground level, used when no altitude is known at all.
pub const GROUND_LEVEL: f64 = 0.0;

/// Expand a sparse array into a dense one of length `len`.
///
/// `sparse` may be shorter than `len`; missing slots count as undefined.
pub fn propagate(len: usize, sparse: &[Option<f64>], floor: f64, default: f64) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }

    let slot = |i: usize| sparse.get(i).copied().flatten();
    let mut dense = vec![0.0; len];

    let mut anchor_idx = 0;
    let mut anchor_val = slot(0).unwrap_or_else(|| default.max(floor));
    dense[0] = anchor_val;

    for i in 1..len {
        let Some(value) = slot(i) else {
            continue;
        };

        let span = (i - anchor_idx) as f64;
        for (j, filled) in dense.iter_mut().enumerate().take(i).skip(anchor_idx + 1) {
            let t = (j - anchor_idx) as f64 / span;
            *filled = (anchor_val + t * (value - anchor_val)).max(floor);
        }

        dense[i] = value;
        anchor_idx = i;
        anchor_val = value;
    }

    for filled in dense.iter_mut().skip(anchor_idx + 1) {
        *filled = anchor_val.max(floor);
    }

    dense
}

/// Dense per-vertex attribute tables. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTables {
    speed: Vec<f64>,
    altitude: Vec<f64>,
    pause: Vec<f64>,
}

impl AttributeTables {
    /// Build all tables for a path of `len` vertices.
    pub fn build(
        len: usize,
        speeds: &[Option<f64>],
        altitudes: &[Option<f64>],
        pauses: &[Option<f64>],
        options: &SynthOptions,
    ) -> Self {
        let pause = (0..len)
            .map(|i| pauses.get(i).copied().flatten().unwrap_or(0.0))
            .collect();

        Self {
            speed: propagate(len, speeds, options.min_speed, options.speed),
            altitude: propagate(len, altitudes, f64::MIN, GROUND_LEVEL),
            pause,
        }
    }

    /// Number of vertices covered.
    pub fn len(&self) -> usize {
        self.speed.len()
    }

    /// True if the tables cover no vertex.
    pub fn is_empty(&self) -> bool {
        self.speed.is_empty()
    }

    /// Target speed at a vertex (m/s).
    pub fn speed(&self, index: usize) -> f64 {
        self.speed[index]
    }

    /// Target altitude at a vertex (m).
    pub fn altitude(&self, index: usize) -> f64 {
        self.altitude[index]
    }

    /// Dwell time at a vertex (s).
    pub fn pause(&self, index: usize) -> f64 {
        self.pause[index]
    }

    /// The full speed table.
    pub fn speeds(&self) -> &[f64] {
        &self.speed
    }

    /// The full altitude table.
    pub fn altitudes(&self) -> &[f64] {
        &self.altitude
    }

    /// The full dwell table.
    pub fn pauses(&self) -> &[f64] {
        &self.pause
    }
}
