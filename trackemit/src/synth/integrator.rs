//! Tick integrator.
//!
//! Walks the path vertex by vertex and produces samples on a fixed cadence.
//! A tick budget holds the time left until the next cadence tick; it carries
//! across vertex arrivals and dwells, so the cadence never resets mid-job.
//!
//! Each segment is driven under one constant acceleration taken from the
//! speeds at its two vertices and its full length:
//!
//! ```text
//! a              = (v1^2 - v0^2) / (2 * length)
//! moved(t)       = v * t + a * t^2 / 2
//! time_to_vertex = 2 * d_remaining / (v + v1)
//! ```
//!
//! `v` is the speed interpolated by distance fraction along the segment and
//! floored at `min_speed`. `v0` and `v1` are the unfloored vertex speeds. When
//! a tick would carry the entity past a standstill, the rest of the tick is
//! covered at `min_speed`, so every tick makes forward progress.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::attributes::{AttributeTables, GROUND_LEVEL};
use super::dwell::plan_dwell;
use super::options::{DwellAltitude, SynthOptions};
use super::sample::{Sample, SampleCategory};
use super::sync::SyncArena;
use crate::geo::{GeoProvider, Position};
use crate::path::EntityProperties;

/// Below this displacement from the previous sample, bearing is undefined (m).
pub const MIN_BEARING_DISTANCE_M: f64 = 10.0;

/// Segments shorter than this are crossed in zero time (m).
pub const MIN_SEGMENT_LENGTH_M: f64 = 1e-3;

/// Two times closer than this fall on the same tick (s).
pub const TICK_TOLERANCE: f64 = 1e-6;

/// Emission policy: whether a candidate sample becomes a real one.
pub fn should_emit(
    category: SampleCategory,
    options: &SynthOptions,
    has_sync: bool,
    on_tick: bool,
) -> bool {
    match category {
        SampleCategory::Start | SampleCategory::Edge => true,
        SampleCategory::Vertex => options.vertices || has_sync || on_tick,
        SampleCategory::Wait => !options.quiet || has_sync,
        SampleCategory::Finish => options.last_point || has_sync,
    }
}

/// Output of one integrator run.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    /// Emitted samples, in time order.
    pub samples: Vec<Sample>,
    /// Time from start to arrival at the final vertex, dwells included (s).
    pub duration: f64,
}

// =============================================================================
// Segment kinematics
// =============================================================================

struct Leg<'a, G: GeoProvider + ?Sized> {
    geo: &'a G,
    to: Position,
    length: f64,
    v0: f64,
    v1: f64,
    accel: f64,
    alt0: f64,
    alt1: f64,
    min_speed: f64,
}

impl<G: GeoProvider + ?Sized> Leg<'_, G> {
    fn fraction(&self, pos: &Position) -> f64 {
        (1.0 - self.geo.distance(pos, &self.to) / self.length).clamp(0.0, 1.0)
    }

    fn speed_at(&self, fraction: f64) -> f64 {
        (self.v0 + fraction * (self.v1 - self.v0)).max(self.min_speed)
    }

    fn altitude_at(&self, fraction: f64) -> f64 {
        self.alt0 + fraction * (self.alt1 - self.alt0)
    }

    fn time_to_end(&self, pos: &Position) -> f64 {
        let remaining = self.geo.distance(pos, &self.to);
        let v = self.speed_at(self.fraction(pos));
        let sum = v + self.v1;
        if sum <= 0.0 {
            warn!(
                remaining_m = remaining,
                "Speed and target speed are both zero, jumping to vertex"
            );
            return 0.0;
        }
        2.0 * remaining / sum
    }

    /// Distance covered in `dt` from speed `v`.
    fn displacement(&self, v: f64, dt: f64) -> f64 {
        if v + self.accel * dt >= 0.0 {
            return v * dt + 0.5 * self.accel * dt * dt;
        }
        // Decelerates through zero inside the tick: brake down to the floor,
        // then crawl.
        let braking = ((v - self.min_speed) / -self.accel).clamp(0.0, dt);
        v * braking + 0.5 * self.accel * braking * braking + self.min_speed * (dt - braking)
    }

    fn advance(&self, pos: &Position, dt: f64) -> Position {
        let remaining = self.geo.distance(pos, &self.to);
        if remaining <= 0.0 {
            return self.to;
        }
        let v = self.speed_at(self.fraction(pos));
        let moved = self.displacement(v, dt).clamp(0.0, remaining);
        let heading = self.geo.bearing(pos, &self.to);
        self.geo.destination(pos, heading, moved)
    }
}

// =============================================================================
// Sample recording
// =============================================================================

struct Candidate {
    position: Position,
    elapsed: f64,
    speed: f64,
    category: SampleCategory,
    vertex: Option<usize>,
    on_tick: bool,
}

struct Recorder<'a, G: GeoProvider + ?Sized> {
    geo: &'a G,
    options: &'a SynthOptions,
    properties: Arc<EntityProperties>,
    rng: Option<StdRng>,
    last: Option<Position>,
    samples: Vec<Sample>,
}

impl<'a, G: GeoProvider + ?Sized> Recorder<'a, G> {
    fn new(geo: &'a G, options: &'a SynthOptions, properties: Arc<EntityProperties>) -> Self {
        let rng = (options.jitter > 0.0).then(|| match options.jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        });
        Self {
            geo,
            options,
            properties,
            rng,
            last: None,
            samples: Vec::new(),
        }
    }

    fn offer(&mut self, candidate: Candidate, sync: &mut SyncArena) {
        let payload = match (candidate.category, candidate.vertex) {
            (SampleCategory::Edge, _) | (_, None) => None,
            (_, Some(vertex)) => sync.take(vertex),
        };

        if !should_emit(
            candidate.category,
            self.options,
            payload.is_some(),
            candidate.on_tick,
        ) {
            return;
        }

        let bearing = match self.last {
            Some(prev) if self.geo.distance(&prev, &candidate.position) >= MIN_BEARING_DISTANCE_M => {
                Some(self.geo.bearing(&prev, &candidate.position))
            }
            _ => None,
        };

        let (position, true_position) = match self.rng.as_mut() {
            Some(rng) => {
                let radius = self.options.jitter * rng.random::<f64>();
                let direction = 360.0 * rng.random::<f64>();
                (
                    self.geo.destination(&candidate.position, direction, radius),
                    Some(candidate.position),
                )
            }
            None => (candidate.position, None),
        };

        self.last = Some(candidate.position);
        self.samples.push(Sample {
            position,
            elapsed: candidate.elapsed,
            speed: candidate.speed,
            bearing,
            category: candidate.category,
            sequence: self.samples.len(),
            vertex: candidate.vertex,
            sync: payload,
            true_position,
            properties: Arc::clone(&self.properties),
        });
    }
}

// =============================================================================
// Integrator
// =============================================================================

struct Clock {
    elapsed: f64,
    budget: f64,
}

/// Runs the tick loop over a path with dense attribute tables.
pub struct Integrator<'a, G: GeoProvider + ?Sized> {
    geo: &'a G,
    positions: &'a [Position],
    tables: &'a AttributeTables,
    options: &'a SynthOptions,
}

impl<'a, G: GeoProvider + ?Sized> Integrator<'a, G> {
    /// `positions` and `tables` must cover the same vertices.
    pub fn new(
        geo: &'a G,
        positions: &'a [Position],
        tables: &'a AttributeTables,
        options: &'a SynthOptions,
    ) -> Self {
        debug_assert_eq!(positions.len(), tables.len());
        Self {
            geo,
            positions,
            tables,
            options,
        }
    }

    /// Integrate the whole path, consuming sync markers from `sync`.
    pub fn run(&self, properties: Arc<EntityProperties>, sync: &mut SyncArena) -> Trajectory {
        let n = self.positions.len().min(self.tables.len());
        if n == 0 {
            return Trajectory::default();
        }

        let rate = self.options.rate;
        let mut recorder = Recorder::new(self.geo, self.options, properties);
        let mut clock = Clock {
            elapsed: 0.0,
            budget: rate,
        };

        let mut pos = self.vertex_position(0);
        recorder.offer(
            Candidate {
                position: pos,
                elapsed: 0.0,
                speed: self.tables.speed(0),
                category: SampleCategory::Start,
                vertex: Some(0),
                on_tick: false,
            },
            sync,
        );
        self.dwell(0, pos, &mut clock, &mut recorder, sync);

        for next in 1..n {
            let from = next - 1;
            let length = self.geo.distance(&self.positions[from], &self.positions[next]);
            let (v0, v1) = (self.tables.speed(from), self.tables.speed(next));
            let leg = Leg {
                geo: self.geo,
                to: self.positions[next],
                length,
                v0,
                v1,
                accel: if length > 0.0 {
                    (v1 * v1 - v0 * v0) / (2.0 * length)
                } else {
                    0.0
                },
                alt0: self.tables.altitude(from),
                alt1: self.tables.altitude(next),
                min_speed: self.options.min_speed,
            };

            if leg.length < MIN_SEGMENT_LENGTH_M {
                debug!(segment = from, "Zero-length segment, no time spent");
            } else {
                loop {
                    let to_vertex = leg.time_to_end(&pos);
                    if to_vertex <= clock.budget + TICK_TOLERANCE {
                        clock.elapsed += to_vertex;
                        clock.budget -= to_vertex;
                        break;
                    }

                    let moved = leg.advance(&pos, clock.budget);
                    let fraction = leg.fraction(&moved);
                    pos = self.with_altitude(moved, leg.altitude_at(fraction));
                    clock.elapsed += clock.budget;
                    clock.budget = rate;

                    recorder.offer(
                        Candidate {
                            position: pos,
                            elapsed: clock.elapsed,
                            speed: leg.speed_at(fraction),
                            category: SampleCategory::Edge,
                            vertex: None,
                            on_tick: true,
                        },
                        sync,
                    );
                }
            }

            pos = self.vertex_position(next);
            let on_tick = clock.budget <= TICK_TOLERANCE;
            if on_tick {
                clock.budget = rate;
            }

            let category = if next == n - 1 {
                SampleCategory::Finish
            } else {
                SampleCategory::Vertex
            };
            recorder.offer(
                Candidate {
                    position: pos,
                    elapsed: clock.elapsed,
                    speed: self.tables.speed(next),
                    category,
                    vertex: Some(next),
                    on_tick,
                },
                sync,
            );
            self.dwell(next, pos, &mut clock, &mut recorder, sync);
        }

        debug!(
            vertices = n,
            samples = recorder.samples.len(),
            duration_s = clock.elapsed,
            "Integration complete"
        );

        Trajectory {
            samples: recorder.samples,
            duration: clock.elapsed,
        }
    }

    fn dwell(
        &self,
        vertex: usize,
        arrival: Position,
        clock: &mut Clock,
        recorder: &mut Recorder<'_, G>,
        sync: &mut SyncArena,
    ) {
        let pause = self.tables.pause(vertex);
        if pause <= 0.0 {
            return;
        }

        let position = match self.options.dwell_altitude {
            DwellAltitude::Ground if self.options.altitude => arrival.at_alt(Some(GROUND_LEVEL)),
            _ => arrival,
        };

        let plan = plan_dwell(clock.elapsed, pause, clock.budget, self.options.rate);
        // An absorbed dwell offers its wait at the dwell end, which is a tick
        // when the pause used up the whole budget.
        let waits: Vec<(f64, bool)> = if plan.absorbed() {
            vec![(plan.end, plan.budget <= TICK_TOLERANCE)]
        } else {
            plan.ticks.iter().map(|&t| (t, true)).collect()
        };

        for (elapsed, on_tick) in waits {
            recorder.offer(
                Candidate {
                    position,
                    elapsed,
                    speed: 0.0,
                    category: SampleCategory::Wait,
                    vertex: Some(vertex),
                    on_tick,
                },
                sync,
            );
        }

        clock.elapsed = plan.end;
        clock.budget = if plan.budget <= TICK_TOLERANCE {
            self.options.rate
        } else {
            plan.budget
        };
    }

    fn vertex_position(&self, index: usize) -> Position {
        self.with_altitude(self.positions[index], self.tables.altitude(index))
    }

    fn with_altitude(&self, pos: Position, alt: f64) -> Position {
        pos.at_alt(self.options.altitude.then_some(alt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Spherical;
    use serde_json::json;

    fn east_of(origin: Position, meters: f64) -> Position {
        Spherical.destination(&origin, 90.0, meters)
    }

    /// Collinear path along the equator with vertices at the given offsets.
    fn line(offsets: &[f64]) -> Vec<Position> {
        let origin = Position::new(0.0, 0.0);
        offsets.iter().map(|&m| east_of(origin, m)).collect()
    }

    fn tables(
        len: usize,
        speeds: &[Option<f64>],
        pauses: &[Option<f64>],
        options: &SynthOptions,
    ) -> AttributeTables {
        AttributeTables::build(len, speeds, &[], pauses, options)
    }

    fn run(
        positions: &[Position],
        tables: &AttributeTables,
        options: &SynthOptions,
        sync: &mut SyncArena,
    ) -> Trajectory {
        Integrator::new(&Spherical, positions, tables, options)
            .run(Arc::new(EntityProperties::new()), sync)
    }

    fn categories(t: &Trajectory) -> Vec<SampleCategory> {
        t.samples.iter().map(|s| s.category).collect()
    }

    #[test]
    fn test_should_emit_policy() {
        let options = SynthOptions::default();
        assert!(should_emit(SampleCategory::Edge, &options, false, true));
        assert!(!should_emit(SampleCategory::Vertex, &options, false, false));
        assert!(should_emit(SampleCategory::Vertex, &options, false, true));
        assert!(should_emit(SampleCategory::Vertex, &options, true, false));
        assert!(should_emit(SampleCategory::Finish, &options, false, false));

        let quiet = options.clone().with_quiet(true).with_last_point(false);
        assert!(!should_emit(SampleCategory::Wait, &quiet, false, true));
        assert!(should_emit(SampleCategory::Wait, &quiet, true, false));
        assert!(!should_emit(SampleCategory::Finish, &quiet, false, false));
        assert!(should_emit(SampleCategory::Finish, &quiet, true, false));
    }

    #[test]
    fn test_constant_speed_cadence() {
        let options = SynthOptions::default().with_speed(10.0).with_rate(30.0);
        let positions = line(&[0.0, 1000.0]);
        let tables = tables(2, &[], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());

        assert_eq!(
            categories(&t),
            vec![
                SampleCategory::Start,
                SampleCategory::Edge,
                SampleCategory::Edge,
                SampleCategory::Edge,
                SampleCategory::Finish,
            ]
        );
        assert!((t.duration - 100.0).abs() < 1e-6);
        for (i, s) in t.samples.iter().enumerate().take(4) {
            assert!((s.elapsed - 30.0 * i as f64).abs() < 1e-6);
            assert!((s.speed - 10.0).abs() < 1e-9);
            assert_eq!(s.sequence, i);
        }
        let edge = &t.samples[1];
        let travelled = Spherical.distance(&positions[0], &edge.position);
        assert!((travelled - 300.0).abs() < 1e-3, "travelled {}", travelled);
    }

    #[test]
    fn test_start_bearing_undefined_then_east() {
        let options = SynthOptions::default();
        let positions = line(&[0.0, 1000.0]);
        let tables = tables(2, &[], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());
        assert_eq!(t.samples[0].bearing, None);
        let bearing = t.samples[1].bearing.unwrap();
        assert!((bearing - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_vertex_on_tick_is_emitted() {
        let options = SynthOptions::default().with_speed(10.0).with_rate(30.0);
        let positions = line(&[0.0, 600.0, 1200.0]);
        let tables = tables(3, &[], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());

        let at_vertex: Vec<&Sample> = t
            .samples
            .iter()
            .filter(|s| s.category == SampleCategory::Vertex)
            .collect();
        assert_eq!(at_vertex.len(), 1);
        assert!((at_vertex[0].elapsed - 60.0).abs() < 1e-4);
        assert!(!t
            .samples
            .iter()
            .any(|s| s.category == SampleCategory::Edge && (s.elapsed - 60.0).abs() < 1e-3));
    }

    #[test]
    fn test_vertices_option_emits_every_vertex() {
        let options = SynthOptions::default().with_vertices(true);
        let positions = line(&[0.0, 100.0, 250.0, 400.0]);
        let tables = tables(4, &[], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());
        let vertices: Vec<usize> = t
            .samples
            .iter()
            .filter(|s| s.category == SampleCategory::Vertex)
            .filter_map(|s| s.vertex)
            .collect();
        assert_eq!(vertices, vec![1, 2]);
    }

    #[test]
    fn test_last_point_disabled() {
        let options = SynthOptions::default().with_last_point(false);
        let positions = line(&[0.0, 100.0]);
        let tables = tables(2, &[], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());
        assert_eq!(categories(&t), vec![SampleCategory::Start]);
        assert!((t.duration - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_acceleration_increases_speed() {
        let options = SynthOptions::default().with_rate(10.0);
        let positions = line(&[0.0, 2000.0]);
        let tables = tables(2, &[Some(0.0), Some(20.0)], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());

        let edges: Vec<&Sample> = t
            .samples
            .iter()
            .filter(|s| s.category == SampleCategory::Edge)
            .collect();
        assert!(edges.len() > 3);
        for pair in edges.windows(2) {
            assert!(pair[1].speed >= pair[0].speed);
        }
        assert!(edges.last().unwrap().speed > edges[0].speed);
        assert!(t.duration > 2000.0 / 20.0);
        assert!(t.duration < 2.0 * 2000.0 / options.min_speed);
    }

    #[test]
    fn test_first_tick_uses_segment_acceleration() {
        // a = 20^2 / (2 * 2000) = 0.1 m/s^2, starting at the 1.4 m/s floor
        let options = SynthOptions::default().with_rate(10.0);
        let positions = line(&[0.0, 2000.0]);
        let tables = tables(2, &[Some(0.0), Some(20.0)], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());

        let first = &t.samples[1];
        let travelled = Spherical.distance(&positions[0], &first.position);
        let expected = options.min_speed * 10.0 + 0.5 * 0.1 * 100.0;
        assert!((travelled - expected).abs() < 1e-3, "travelled {}", travelled);
        assert!((first.elapsed - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_hard_braking_still_reaches_vertex() {
        // 100 m/s to a standstill in 200 m: a = -25 m/s^2, which would reverse
        // the entity inside a 3 s tick
        let options = SynthOptions::default().with_rate(3.0).with_min_speed(1.0);
        let positions = line(&[0.0, 200.0]);
        let tables = tables(2, &[Some(100.0), Some(0.0)], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());

        let finish = t.samples.last().unwrap();
        assert_eq!(finish.category, SampleCategory::Finish);
        assert_eq!(finish.position, positions[1]);
        let mut last = 0.0;
        for s in &t.samples {
            let along = Spherical.distance(&positions[0], &s.position);
            assert!(along >= last - 1e-6);
            last = along;
        }
    }

    #[test]
    fn test_pause_filling_budget_keeps_cadence() {
        // Arrive at 5s with 5s to the tick, stop for exactly 5s
        let options = SynthOptions::default().with_rate(10.0).with_speed(10.0);
        let positions = line(&[0.0, 50.0, 100.0]);
        let tables = tables(3, &[], &[None, Some(5.0)], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());

        assert_eq!(
            categories(&t),
            vec![SampleCategory::Start, SampleCategory::Wait, SampleCategory::Finish]
        );
        assert!((t.samples[1].elapsed - 10.0).abs() < 1e-6);
        assert!((t.samples[2].elapsed - 15.0).abs() < 1e-6);
        for pair in t.samples.windows(2) {
            assert!(pair[1].elapsed > pair[0].elapsed);
        }
    }

    #[test]
    fn test_zero_length_segment() {
        let options = SynthOptions::default().with_vertices(true);
        let positions = line(&[0.0, 300.0, 300.0, 600.0]);
        let tables = tables(4, &[], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());
        assert!((t.duration - 60.0).abs() < 1e-4);
        let v1 = t.samples.iter().find(|s| s.vertex == Some(1)).unwrap();
        let v2 = t.samples.iter().find(|s| s.vertex == Some(2)).unwrap();
        assert!((v1.elapsed - v2.elapsed).abs() < 1e-9);
        assert_eq!(v2.bearing, None);
    }

    #[test]
    fn test_dwell_emits_stationary_waits() {
        let options = SynthOptions::default().with_rate(10.0).with_speed(10.0);
        let positions = line(&[0.0, 50.0, 100.0]);
        let tables = tables(3, &[], &[None, Some(35.0)], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());

        let waits: Vec<&Sample> = t
            .samples
            .iter()
            .filter(|s| s.category == SampleCategory::Wait)
            .collect();
        // Arrive at 5s; ticks at 10, 20, 30, 40 inside a dwell ending at 40
        assert_eq!(waits.len(), 4);
        for w in &waits {
            assert_eq!(w.speed, 0.0);
            assert_eq!(w.vertex, Some(1));
            assert_eq!(w.position, positions[1]);
        }
        // Only the first wait moved away from the start sample
        assert!(waits[0].bearing.is_some());
        assert!(waits[1..].iter().all(|w| w.bearing.is_none()));
        assert!((t.duration - 45.0).abs() < 1e-4);
    }

    #[test]
    fn test_quiet_dwell_suppresses_waits() {
        let options = SynthOptions::default().with_rate(10.0).with_quiet(true);
        let positions = line(&[0.0, 50.0, 100.0]);
        let tables = tables(3, &[], &[None, Some(35.0)], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());
        assert!(!t.samples.iter().any(|s| s.category == SampleCategory::Wait));
        assert!((t.duration - 45.0).abs() < 1e-4);
    }

    #[test]
    fn test_absorbed_dwell_single_wait() {
        let options = SynthOptions::default().with_rate(30.0);
        let positions = line(&[0.0, 50.0, 100.0]);
        let tables = tables(3, &[], &[None, Some(3.0)], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());
        let waits: Vec<&Sample> = t
            .samples
            .iter()
            .filter(|s| s.category == SampleCategory::Wait)
            .collect();
        assert_eq!(waits.len(), 1);
        assert!((waits[0].elapsed - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_dwell_ground_altitude() {
        let options = SynthOptions::default()
            .with_rate(10.0)
            .with_altitude(true)
            .with_dwell_altitude(DwellAltitude::Ground);
        let positions = line(&[0.0, 50.0, 100.0]);
        let tables = AttributeTables::build(
            3,
            &[],
            &[Some(300.0), None, None],
            &[None, Some(20.0)],
            &options,
        );
        let t = run(&positions, &tables, &options, &mut SyncArena::default());
        for s in &t.samples {
            let alt = s.position.alt.unwrap();
            if s.category == SampleCategory::Wait {
                assert_eq!(alt, GROUND_LEVEL);
            } else {
                assert_eq!(alt, 300.0);
            }
        }
    }

    #[test]
    fn test_altitude_interpolated_along_segment() {
        let options = SynthOptions::default().with_rate(10.0).with_altitude(true);
        let positions = line(&[0.0, 200.0]);
        let tables = AttributeTables::build(2, &[], &[Some(0.0), Some(200.0)], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());
        let edge = &t.samples[1];
        // 100m of 200m travelled
        assert!((edge.position.alt.unwrap() - 100.0).abs() < 1e-3);
        assert_eq!(t.samples.last().unwrap().position.alt, Some(200.0));
    }

    #[test]
    fn test_two_dimensional_without_altitude() {
        let options = SynthOptions::default();
        let positions = vec![Position::with_alt(0.0, 0.0, 50.0), east_of(Position::new(0.0, 0.0), 500.0)];
        let tables = tables(2, &[], &[], &options);
        let t = run(&positions, &tables, &options, &mut SyncArena::default());
        assert!(t.samples.iter().all(|s| s.position.alt.is_none()));
    }

    #[test]
    fn test_sync_forces_vertex_once() {
        let options = SynthOptions::default().with_rate(10.0).with_quiet(true);
        let positions = line(&[0.0, 45.0, 100.0]);
        let tables = tables(3, &[], &[None, Some(30.0)], &options);
        let mut sync = SyncArena::new(vec![None, Some(json!({"mark": "gate"})), None]);
        let t = run(&positions, &tables, &options, &mut sync);

        let marked: Vec<&Sample> = t.samples.iter().filter(|s| s.sync.is_some()).collect();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].category, SampleCategory::Vertex);
        assert_eq!(marked[0].mark(), Some("gate"));
        assert!((marked[0].elapsed - 4.5).abs() < 1e-4);
        assert_eq!(sync.pending(), 0);
    }

    #[test]
    fn test_sync_at_start_attaches_to_start() {
        let options = SynthOptions::default();
        let positions = line(&[0.0, 100.0]);
        let tables = tables(2, &[], &[], &options);
        let mut sync = SyncArena::new(vec![Some(json!({"mark": "offblock"})), None]);
        let t = run(&positions, &tables, &options, &mut sync);
        assert_eq!(t.samples[0].mark(), Some("offblock"));
        assert!(t.samples[1..].iter().all(|s| s.sync.is_none()));
    }

    #[test]
    fn test_jitter_seeded_is_reproducible() {
        let options = SynthOptions::default().with_rate(10.0).with_jitter(25.0, Some(7));
        let positions = line(&[0.0, 500.0]);
        let tables = tables(2, &[], &[], &options);
        let a = run(&positions, &tables, &options, &mut SyncArena::default());
        let b = run(&positions, &tables, &options, &mut SyncArena::default());
        assert_eq!(a.samples, b.samples);

        for s in &a.samples {
            let truth = s.true_position.unwrap();
            assert!(Spherical.distance(&truth, &s.position) <= 25.0 + 1e-6);
        }
    }

    #[test]
    fn test_empty_path() {
        let options = SynthOptions::default();
        let tables = tables(0, &[], &[], &options);
        let t = run(&[], &tables, &options, &mut SyncArena::default());
        assert!(t.samples.is_empty());
        assert_eq!(t.duration, 0.0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn test_time_monotonic_and_cadence_bounded(
                legs in prop::collection::vec(5.0..800.0_f64, 1..6),
                speeds in prop::collection::vec(prop::option::of(0.0..40.0_f64), 0..7),
                rate in 1.0..60.0_f64,
            ) {
                let options = SynthOptions::default().with_rate(rate);
                let mut offsets = vec![0.0];
                for leg in &legs {
                    let last = *offsets.last().unwrap();
                    offsets.push(last + leg);
                }
                let positions = line(&offsets);
                let tables = tables(positions.len(), &speeds, &[], &options);
                let t = run(&positions, &tables, &options, &mut SyncArena::default());

                prop_assert_eq!(t.samples[0].category, SampleCategory::Start);
                for pair in t.samples.windows(2) {
                    prop_assert!(pair[1].elapsed >= pair[0].elapsed);
                    prop_assert!(pair[1].elapsed - pair[0].elapsed <= rate + 1e-4);
                }
                for (i, s) in t.samples.iter().enumerate() {
                    prop_assert_eq!(s.sequence, i);
                    prop_assert!(s.elapsed <= t.duration + 1e-6);
                }
            }
        }
    }
}
