//! Versioned emission scheduling.
//!
//! Synthesis produces samples with times relative to the start of a job.
//! The scheduler pins a job to a base instant and delivers each sample to a
//! [`SampleSink`] when it falls due on the daemon's [`EmissionClock`].
//!
//! Entities are re-planned all the time (a taxi route changes, a departure
//! slips), so every entity carries a version. Scheduling a new job for an
//! entity supersedes the old one without touching the queue: entries of the
//! old version are discarded lazily when they come due.
//!
//! ```text
//! schedule(E, job) ──► version++ ──► entries (E, version, due, sample) ──► heap
//!                                                                          │
//! drain(now) ◄─────────────────────────────────────────────────────────────┘
//!     │ version current? ──► yes ──► sink.publish
//!     └────────────────────► no  ──► discard
//! ```

mod clock;
mod daemon;
mod error;
mod format;
mod job;
mod metrics;
mod queue;
mod scheduler;
mod sink;

pub use clock::{EmissionClock, ScaledClock, SystemClock};
pub use daemon::{EmissionDaemon, EmissionDaemonConfig, DEFAULT_IDLE_WAIT_MS};
pub use error::ScheduleError;
pub use format::{FlatFormatter, GeoJsonFormatter, OutputFormat, SampleFormatter, FLAT_KEY_SEPARATOR};
pub use job::{seconds, EmissionJob, EntityId};
pub use metrics::{MetricsSnapshot, SchedulerMetrics};
pub use scheduler::EmissionScheduler;
pub use sink::{ChannelSink, Delivery, JsonLinesSink, LineWriter, SampleSink};
