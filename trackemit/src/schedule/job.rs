//! Emission jobs: a sample list pinned to a base instant on the emission clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::ScheduleError;
use crate::synth::{Sample, Synthesis};

/// Identifier of the entity a job moves (aircraft registration, vehicle id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an entity id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Convert fractional seconds to a chrono duration (microsecond precision).
pub fn seconds(secs: f64) -> Duration {
    Duration::microseconds((secs * 1_000_000.0).round() as i64)
}

/// Samples to deliver, each due at `base + elapsed`.
#[derive(Debug, Clone)]
pub struct EmissionJob {
    samples: Vec<Sample>,
    base: DateTime<Utc>,
}

impl EmissionJob {
    /// Create a job whose elapsed time 0 falls on `base`.
    pub fn new(samples: Vec<Sample>, base: DateTime<Utc>) -> Self {
        Self { samples, base }
    }

    /// Create a job starting now.
    pub fn starting_now(samples: Vec<Sample>) -> Self {
        Self::new(samples, Utc::now())
    }

    /// Create a job from a synthesis result.
    pub fn from_synthesis(synthesis: Synthesis, base: DateTime<Utc>) -> Self {
        Self::new(synthesis.samples, base)
    }

    /// Create a job positioned so the sample carrying `mark` is due exactly
    /// at `moment`.
    ///
    /// Used to pin a movement to a known event, e.g. an arrival whose
    /// on-block time is fixed while the approach is generated backwards.
    pub fn anchored(
        samples: Vec<Sample>,
        mark: &str,
        moment: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        let offset = samples
            .iter()
            .find(|s| s.mark() == Some(mark))
            .map(|s| s.elapsed)
            .ok_or_else(|| ScheduleError::MarkNotFound(mark.to_string()))?;
        Ok(Self::new(samples, moment - seconds(offset)))
    }

    /// The samples, in time order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Instant of elapsed time 0.
    pub fn base(&self) -> DateTime<Utc> {
        self.base
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the job carries no sample.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Due instant of a sample of this job.
    pub fn due_at(&self, sample: &Sample) -> DateTime<Utc> {
        self.base + seconds(sample.elapsed)
    }

    /// Due instant of the last sample.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| self.due_at(s))
    }

    pub(crate) fn into_parts(self) -> (Vec<Sample>, DateTime<Utc>) {
        (self.samples, self.base)
    }
}
