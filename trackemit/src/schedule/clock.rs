//! Emission clocks.
//!
//! The daemon asks its clock what time it is and how long to sleep until a
//! due instant. [`SystemClock`] is the wall clock. [`ScaledClock`] replays a
//! scenario from a chosen start instant, faster or slower than real time:
//!
//! ```text
//! now   = start + (wall_now - wall_origin) * speed
//! sleep = (due - now) / speed
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::error::ScheduleError;
use super::job::seconds;

/// Source of "now" for the emission daemon.
pub trait EmissionClock: Send + Sync {
    /// Current instant on this clock.
    fn now(&self) -> DateTime<Utc>;

    /// Real time to sleep until `due` is reached on this clock.
    fn until(&self, due: DateTime<Utc>) -> Duration;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl EmissionClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn until(&self, due: DateTime<Utc>) -> Duration {
        (due - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

/// A clock that starts at an arbitrary instant and runs `speed` times as
/// fast as the wall clock.
#[derive(Debug, Clone)]
pub struct ScaledClock {
    wall_origin: DateTime<Utc>,
    start: DateTime<Utc>,
    speed: f64,
}

impl ScaledClock {
    /// Clock reading `start` right now.
    pub fn new(start: DateTime<Utc>, speed: f64) -> Result<Self, ScheduleError> {
        Self::starting_at(Utc::now(), start, speed)
    }

    /// Clock reading `start` at wall instant `wall_origin`.
    pub fn starting_at(
        wall_origin: DateTime<Utc>,
        start: DateTime<Utc>,
        speed: f64,
    ) -> Result<Self, ScheduleError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ScheduleError::InvalidSpeed(speed));
        }
        Ok(Self {
            wall_origin,
            start,
            speed,
        })
    }

    /// Speed factor against the wall clock.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Reading of this clock at wall instant `wall`.
    pub fn at(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        let real = to_seconds(wall - self.wall_origin);
        self.start
            .checked_add_signed(seconds(real * self.speed))
            .unwrap_or(if real >= 0.0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            })
    }

    /// Real time between clock readings `from` and `to`.
    pub fn real_span(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
        let scaled = to_seconds(to - from) / self.speed;
        if scaled > 0.0 {
            Duration::try_from_secs_f64(scaled).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}

impl EmissionClock for ScaledClock {
    fn now(&self) -> DateTime<Utc> {
        self.at(Utc::now())
    }

    fn until(&self, due: DateTime<Utc>) -> Duration {
        self.real_span(self.now(), due)
    }
}

fn to_seconds(delta: chrono::Duration) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}
