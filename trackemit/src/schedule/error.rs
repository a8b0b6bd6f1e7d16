//! Scheduler error type.

use thiserror::Error;

/// Errors raised when building or scheduling emission jobs.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// No sample of the job carries the requested mark.
    #[error("No sample carries mark '{0}'")]
    MarkNotFound(String),

    /// A clock speed factor that is not a positive finite number.
    #[error("Clock speed must be a positive number, got {0}")]
    InvalidSpeed(f64),
}
