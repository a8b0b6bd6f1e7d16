//! CLI error type.

use std::path::PathBuf;

use thiserror::Error;
use trackemit::config::ConfigError;
use trackemit::logging::LoggingError;
use trackemit::path::PathError;
use trackemit::schedule::ScheduleError;
use trackemit::synth::SynthError;

/// Errors surfaced to the user by the `trackemit` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: PathError,
    },

    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}
