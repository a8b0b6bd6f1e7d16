//! trackemit - trajectory synthesis and timed emission for moving entities
//!
//! This library turns a route (a GeoJSON `LineString` with sparse per-vertex
//! speeds, altitudes, dwell times and sync markers) into a stream of timed
//! position reports, and delivers those reports at their wall-clock instants.
//!
//! - [`path`]: route input and validation
//! - [`synth`]: attribute propagation, tick integration, dwells, smoothing
//! - [`schedule`]: versioned, lock-protected emission queue and its daemon
//! - [`config`] / [`logging`]: INI configuration and `tracing` setup

pub mod config;
pub mod geo;
pub mod logging;
pub mod path;
pub mod schedule;
pub mod synth;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
