//! Turn smoothing.
//!
//! A smoother rewrites the vertex list before integration, typically
//! replacing a sharp corner with a run of arc points. It returns an index map
//! so per-vertex data (speeds, altitudes, dwells, sync markers) can follow
//! each original vertex to its new position.

use crate::geo::{normalize_bearing, GeoProvider, Position};

use super::attributes::AttributeTables;
use super::error::SynthError;

/// Default arc radius (m).
pub const DEFAULT_RADIUS_M: f64 = 50.0;

/// Default minimum heading change that triggers an arc (degrees).
pub const DEFAULT_MIN_TURN_DEG: f64 = 15.0;

/// Default number of points per arc.
pub const DEFAULT_ARC_POINTS: usize = 5;

/// Arcs shorter than this leave the corner as is (m).
const MIN_ARC_RADIUS_M: f64 = 1.0;

/// A rewritten path with anchors re-expressed against the new vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedPath {
    /// New vertex list.
    pub positions: Vec<Position>,
    /// `index_map[i]` is the new index of original vertex `i`.
    pub index_map: Vec<usize>,
    /// Sparse speed anchors for the new vertices.
    pub speeds: Vec<Option<f64>>,
    /// Sparse altitude anchors for the new vertices.
    pub altitudes: Vec<Option<f64>>,
    /// Dwell times for the new vertices.
    pub pauses: Vec<Option<f64>>,
}

impl SmoothedPath {
    /// The unchanged path.
    pub fn identity(positions: &[Position], tables: &AttributeTables) -> Self {
        let n = positions.len();
        Self {
            positions: positions.to_vec(),
            index_map: (0..n).collect(),
            speeds: tables.speeds().iter().copied().map(Some).collect(),
            altitudes: tables.altitudes().iter().copied().map(Some).collect(),
            pauses: tables.pauses().iter().copied().map(Some).collect(),
        }
    }

    /// Check the invariants the integrator relies on.
    pub fn validate(&self, original_len: usize) -> Result<(), SynthError> {
        let n = self.positions.len();
        if self.index_map.len() != original_len {
            return Err(SynthError::Smoothing(format!(
                "index map covers {} vertices, path has {}",
                self.index_map.len(),
                original_len
            )));
        }
        if n < 2 {
            return Err(SynthError::Smoothing(format!(
                "smoothed path has {} vertices",
                n
            )));
        }
        if self.index_map.first() != Some(&0) || self.index_map.last() != Some(&(n - 1)) {
            return Err(SynthError::Smoothing(
                "endpoints must map to endpoints".to_string(),
            ));
        }
        if self.index_map.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SynthError::Smoothing(
                "index map must be strictly increasing".to_string(),
            ));
        }
        if let Some(i) = self.positions.iter().position(|p| !p.is_valid()) {
            return Err(SynthError::Smoothing(format!(
                "vertex {} is not a valid position",
                i
            )));
        }
        for (name, table) in [
            ("speeds", &self.speeds),
            ("altitudes", &self.altitudes),
            ("pauses", &self.pauses),
        ] {
            if table.len() > n {
                return Err(SynthError::Smoothing(format!(
                    "{} has {} slots for {} vertices",
                    name,
                    table.len(),
                    n
                )));
            }
        }
        Ok(())
    }
}

/// Rewrites a path before integration.
pub trait PathSmoother: Send + Sync {
    /// Produce the smoothed path for `positions` with dense `tables`.
    fn smooth(
        &self,
        geo: &dyn GeoProvider,
        positions: &[Position],
        tables: &AttributeTables,
    ) -> Result<SmoothedPath, SynthError>;
}

/// Leaves the path untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSmoothing;

impl PathSmoother for NoSmoothing {
    fn smooth(
        &self,
        _geo: &dyn GeoProvider,
        positions: &[Position],
        tables: &AttributeTables,
    ) -> Result<SmoothedPath, SynthError> {
        Ok(SmoothedPath::identity(positions, tables))
    }
}

/// Replaces corners with quadratic Bezier arcs.
///
/// The arc starts and ends `radius` meters from the corner along each leg,
/// capped at half of the shorter leg so neighbouring arcs never overlap.
/// The original vertex maps to the middle arc point. Corners carrying a
/// dwell keep their exact position.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcSmoother {
    /// Distance from the corner where the arc begins (m).
    pub radius_m: f64,
    /// Smallest heading change that gets an arc (degrees).
    pub min_turn_deg: f64,
    /// Points per arc, forced odd and at least 3.
    pub arc_points: usize,
}

impl Default for ArcSmoother {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_RADIUS_M,
            min_turn_deg: DEFAULT_MIN_TURN_DEG,
            arc_points: DEFAULT_ARC_POINTS,
        }
    }
}

impl ArcSmoother {
    /// Create a smoother with explicit parameters.
    pub fn new(radius_m: f64, min_turn_deg: f64, arc_points: usize) -> Self {
        Self {
            radius_m,
            min_turn_deg,
            arc_points,
        }
    }

    fn points_per_arc(&self) -> usize {
        let k = self.arc_points.max(3);
        if k % 2 == 0 {
            k + 1
        } else {
            k
        }
    }

    fn arc(
        &self,
        geo: &dyn GeoProvider,
        prev: &Position,
        corner: &Position,
        next: &Position,
    ) -> Option<Vec<Position>> {
        let inbound = geo.bearing(prev, corner);
        let outbound = geo.bearing(corner, next);
        if turn_angle(inbound, outbound) < self.min_turn_deg {
            return None;
        }

        let radius = self
            .radius_m
            .min(geo.distance(prev, corner) / 2.0)
            .min(geo.distance(corner, next) / 2.0);
        if radius < MIN_ARC_RADIUS_M {
            return None;
        }

        let entry = geo.destination(corner, geo.bearing(corner, prev), radius);
        let exit = geo.destination(corner, outbound, radius);

        let k = self.points_per_arc();
        let points = (0..k)
            .map(|s| {
                let t = s as f64 / (k - 1) as f64;
                bezier(&entry, corner, &exit, t)
            })
            .collect();
        Some(points)
    }
}

impl PathSmoother for ArcSmoother {
    fn smooth(
        &self,
        geo: &dyn GeoProvider,
        positions: &[Position],
        tables: &AttributeTables,
    ) -> Result<SmoothedPath, SynthError> {
        let n = positions.len();
        if n < 3 {
            return Ok(SmoothedPath::identity(positions, tables));
        }

        let mut out = Vec::with_capacity(n);
        let mut index_map = Vec::with_capacity(n);

        out.push(positions[0]);
        index_map.push(0);

        for i in 1..n - 1 {
            let arc = if tables.pause(i) > 0.0 {
                None
            } else {
                self.arc(geo, &positions[i - 1], &positions[i], &positions[i + 1])
            };

            match arc {
                Some(points) => {
                    index_map.push(out.len() + points.len() / 2);
                    out.extend(points);
                }
                None => {
                    index_map.push(out.len());
                    out.push(positions[i]);
                }
            }
        }

        index_map.push(out.len());
        out.push(positions[n - 1]);

        let len = out.len();
        let mut speeds = vec![None; len];
        let mut altitudes = vec![None; len];
        let mut pauses = vec![None; len];
        for (original, &new) in index_map.iter().enumerate() {
            speeds[new] = Some(tables.speed(original));
            altitudes[new] = Some(tables.altitude(original));
            let pause = tables.pause(original);
            if pause > 0.0 {
                pauses[new] = Some(pause);
            }
        }

        Ok(SmoothedPath {
            positions: out,
            index_map,
            speeds,
            altitudes,
            pauses,
        })
    }
}

/// Absolute heading change between two bearings, in `[0, 180]`.
fn turn_angle(inbound: f64, outbound: f64) -> f64 {
    let diff = normalize_bearing(outbound - inbound);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Quadratic Bezier in lon/lat space. Longitudes are unwrapped around the
/// control point so arcs crossing the antimeridian stay short.
fn bezier(p0: &Position, p1: &Position, p2: &Position, t: f64) -> Position {
    let lon0 = unwrap_lon(p0.lon, p1.lon);
    let lon2 = unwrap_lon(p2.lon, p1.lon);
    let u = 1.0 - t;
    let lon = u * u * lon0 + 2.0 * u * t * p1.lon + t * t * lon2;
    let lat = u * u * p0.lat + 2.0 * u * t * p1.lat + t * t * p2.lat;
    Position::new(wrap_lon(lon), lat)
}

fn unwrap_lon(lon: f64, reference: f64) -> f64 {
    let delta = lon - reference;
    if delta > 180.0 {
        lon - 360.0
    } else if delta < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

fn wrap_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 540.0) % 360.0 - 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Spherical;
    use crate::synth::options::SynthOptions;

    fn corner_path() -> Vec<Position> {
        // East 1km, then north 1km
        let a = Position::new(0.0, 0.0);
        let b = Spherical.destination(&a, 90.0, 1000.0);
        let c = Spherical.destination(&b, 0.0, 1000.0);
        vec![a, b, c]
    }

    fn tables(len: usize, pauses: &[Option<f64>]) -> AttributeTables {
        AttributeTables::build(len, &[], &[], pauses, &SynthOptions::default())
    }

    #[test]
    fn test_turn_angle() {
        assert_eq!(turn_angle(90.0, 0.0), 90.0);
        assert_eq!(turn_angle(350.0, 10.0), 20.0);
        assert_eq!(turn_angle(10.0, 10.0), 0.0);
        assert_eq!(turn_angle(0.0, 180.0), 180.0);
    }

    #[test]
    fn test_right_angle_becomes_arc() {
        let positions = corner_path();
        let smoother = ArcSmoother::default();
        let out = smoother
            .smooth(&Spherical, &positions, &tables(3, &[]))
            .unwrap();

        assert_eq!(out.positions.len(), 2 + DEFAULT_ARC_POINTS);
        assert_eq!(out.index_map, vec![0, 3, 6]);
        assert!(out.validate(3).is_ok());

        let entry = out.positions[1];
        let exit = out.positions[5];
        assert!((Spherical.distance(&entry, &positions[1]) - 50.0).abs() < 0.1);
        assert!((Spherical.distance(&exit, &positions[1]) - 50.0).abs() < 0.1);

        // The arc cuts the corner
        let mid = out.positions[3];
        let cut = Spherical.distance(&mid, &positions[1]);
        assert!(cut > 1.0 && cut < 50.0, "cut {}", cut);
    }

    #[test]
    fn test_shallow_turn_untouched() {
        let a = Position::new(0.0, 0.0);
        let b = Spherical.destination(&a, 90.0, 1000.0);
        let c = Spherical.destination(&b, 95.0, 1000.0);
        let positions = vec![a, b, c];
        let out = ArcSmoother::default()
            .smooth(&Spherical, &positions, &tables(3, &[]))
            .unwrap();
        assert_eq!(out.positions, positions);
        assert_eq!(out.index_map, vec![0, 1, 2]);
    }

    #[test]
    fn test_dwell_vertex_kept() {
        let positions = corner_path();
        let out = ArcSmoother::default()
            .smooth(&Spherical, &positions, &tables(3, &[None, Some(60.0)]))
            .unwrap();
        assert_eq!(out.positions, positions);
        assert_eq!(out.pauses, vec![None, Some(60.0), None]);
    }

    #[test]
    fn test_radius_capped_by_short_leg() {
        let a = Position::new(0.0, 0.0);
        let b = Spherical.destination(&a, 90.0, 40.0);
        let c = Spherical.destination(&b, 0.0, 1000.0);
        let out = ArcSmoother::default()
            .smooth(&Spherical, &[a, b, c], &tables(3, &[]))
            .unwrap();
        let entry = out.positions[1];
        assert!((Spherical.distance(&entry, &b) - 20.0).abs() < 0.1);
    }

    #[test]
    fn test_even_arc_points_rounded_up() {
        let smoother = ArcSmoother::new(50.0, 15.0, 4);
        assert_eq!(smoother.points_per_arc(), 5);
        assert_eq!(ArcSmoother::new(50.0, 15.0, 0).points_per_arc(), 3);
    }

    #[test]
    fn test_anchors_follow_vertices() {
        let positions = corner_path();
        let options = SynthOptions::default();
        let tables = AttributeTables::build(
            3,
            &[Some(5.0), Some(8.0), Some(2.0)],
            &[],
            &[],
            &options,
        );
        let out = ArcSmoother::default()
            .smooth(&Spherical, &positions, &tables)
            .unwrap();
        assert_eq!(out.speeds[0], Some(5.0));
        assert_eq!(out.speeds[3], Some(8.0));
        assert_eq!(out.speeds[6], Some(2.0));
        assert_eq!(out.speeds[1], None);
    }

    #[test]
    fn test_no_smoothing_is_identity() {
        let positions = corner_path();
        let tables = tables(3, &[]);
        let out = NoSmoothing.smooth(&Spherical, &positions, &tables).unwrap();
        assert_eq!(out, SmoothedPath::identity(&positions, &tables));
        assert!(out.validate(3).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_index_map() {
        let positions = corner_path();
        let mut out = SmoothedPath::identity(&positions, &tables(3, &[]));
        out.index_map = vec![0, 2, 1];
        assert!(matches!(out.validate(3), Err(SynthError::Smoothing(_))));
        out.index_map = vec![0, 1];
        assert!(out.validate(3).is_err());
    }

    #[test]
    fn test_antimeridian_arc_stays_local() {
        let a = Position::new(179.99, 0.0);
        let b = Position::new(-179.99, 0.0);
        let c = Spherical.destination(&b, 0.0, 2000.0);
        let out = ArcSmoother::default()
            .smooth(&Spherical, &[a, b, c], &tables(3, &[]))
            .unwrap();
        for p in &out.positions[1..out.positions.len() - 1] {
            assert!(Spherical.distance(p, &b) < 60.0);
        }
    }
}
