//! Synthesis error type.

use thiserror::Error;

use crate::path::PathError;

/// Errors that abort a synthesis run.
#[derive(Debug, Error)]
pub enum SynthError {
    /// The input path is malformed.
    #[error("Invalid path: {0}")]
    Path(#[from] PathError),

    /// An option value is out of range.
    #[error("Invalid option '{name}': {reason}")]
    InvalidOption { name: &'static str, reason: String },

    /// The smoothing pass produced something the integrator cannot use.
    #[error("Smoothing failed: {0}")]
    Smoothing(String),
}
