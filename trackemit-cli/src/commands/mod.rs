//! CLI command implementations.

pub mod config;
pub mod emit;
pub mod synth;

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Args;
use trackemit::config::ConfigFile;
use trackemit::path::PathFeature;
use trackemit::synth::{SynthOptions, Synthesizer};

use crate::error::CliError;

/// Synthesis overrides shared by `synth` and `emit`. Unset flags fall back to
/// the `[synthesis]` section of the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct SynthArgs {
    /// Sampling cadence in seconds
    #[arg(long)]
    pub rate: Option<f64>,

    /// Default speed in m/s for vertices without one
    #[arg(long)]
    pub speed: Option<f64>,

    /// Speed floor in m/s
    #[arg(long)]
    pub min_speed: Option<f64>,

    /// Emit 3D positions
    #[arg(long)]
    pub altitude: bool,

    /// Round sharp corners before integrating
    #[arg(long)]
    pub smooth: bool,

    /// Emit a sample at every vertex
    #[arg(long)]
    pub vertices: bool,

    /// Suppress dwell samples that carry no sync marker
    #[arg(long)]
    pub quiet: bool,

    /// Positional noise radius in meters
    #[arg(long)]
    pub jitter: Option<f64>,

    /// Seed for the jitter generator
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SynthArgs {
    /// Apply the overrides on top of the configured options.
    pub fn resolve(&self, config: &ConfigFile) -> SynthOptions {
        let mut options = config.synthesis.clone();
        if let Some(rate) = self.rate {
            options.rate = rate;
        }
        if let Some(speed) = self.speed {
            options.speed = speed;
        }
        if let Some(min_speed) = self.min_speed {
            options.min_speed = min_speed;
        }
        if let Some(jitter) = self.jitter {
            options.jitter = jitter;
        }
        if self.seed.is_some() {
            options.jitter_seed = self.seed;
        }
        options.altitude |= self.altitude;
        options.smooth |= self.smooth;
        options.vertices |= self.vertices;
        options.quiet |= self.quiet;
        options
    }
}

/// Synthesizer configured from the `[smoothing]` section.
pub fn synthesizer(config: &ConfigFile) -> Synthesizer {
    Synthesizer::default().with_smoother(config.smoothing.smoother())
}

/// Read a path feature from a file, or from stdin when `path` is `-`.
pub fn read_feature(path: &Path) -> Result<PathFeature, CliError> {
    let read_err = |source| CliError::Read {
        path: path.to_path_buf(),
        source,
    };

    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(read_err)?;
        text
    } else {
        std::fs::read_to_string(path).map_err(read_err)?
    };

    PathFeature::from_geojson_str(&text).map_err(|source| CliError::Path {
        path: PathBuf::from(path),
        source,
    })
}
