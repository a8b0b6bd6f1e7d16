//! Emission daemon: drives an [`EmissionScheduler`] against an
//! [`EmissionClock`] (the wall clock unless configured otherwise).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     EmissionDaemon                        │
//! │                                                           │
//! │   ┌────────────┐   due entries   ┌────────────┐           │
//! │   │ Scheduler  │────────────────►│ SampleSink │           │
//! │   └─────┬──────┘                 └────────────┘           │
//! │         │ next due                                        │
//! │         ▼                                                 │
//! │   sleep(min(clock.until(next_due), idle_wait))            │
//! │         ▲                                                 │
//! │         └── woken early by an earlier insertion           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use trackemit::schedule::{EmissionDaemon, EmissionDaemonConfig, EmissionScheduler};
//!
//! let scheduler = Arc::new(EmissionScheduler::new());
//! let (sink, mut deliveries) = ChannelSink::new();
//! let daemon = EmissionDaemon::new(scheduler.clone(), Arc::new(sink), EmissionDaemonConfig::default());
//!
//! let shutdown = CancellationToken::new();
//! tokio::spawn(daemon.run(shutdown.clone()));
//!
//! scheduler.schedule("A7-BAE", EmissionJob::starting_now(synthesis.samples));
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::clock::{EmissionClock, SystemClock};
use super::scheduler::EmissionScheduler;
use super::sink::SampleSink;

// =============================================================================
// Configuration
// =============================================================================

/// Default upper bound on one sleep (1 second).
pub const DEFAULT_IDLE_WAIT_MS: u64 = 1000;

/// Configuration for the emission daemon.
#[derive(Clone, Debug)]
pub struct EmissionDaemonConfig {
    /// Longest the daemon sleeps before checking the queue again.
    pub idle_wait: Duration,

    /// Stop as soon as the queue is empty.
    pub stop_when_empty: bool,
}

impl Default for EmissionDaemonConfig {
    fn default() -> Self {
        Self {
            idle_wait: Duration::from_millis(DEFAULT_IDLE_WAIT_MS),
            stop_when_empty: false,
        }
    }
}

impl EmissionDaemonConfig {
    /// Set the idle wait bound.
    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    /// Stop once every queued entry is delivered or discarded.
    pub fn with_stop_when_empty(mut self, enabled: bool) -> Self {
        self.stop_when_empty = enabled;
        self
    }
}

// =============================================================================
// Emission Daemon
// =============================================================================

/// Long-running consumer of the scheduler.
pub struct EmissionDaemon {
    scheduler: Arc<EmissionScheduler>,
    sink: Arc<dyn SampleSink>,
    clock: Arc<dyn EmissionClock>,
    config: EmissionDaemonConfig,
}

impl EmissionDaemon {
    /// Create a daemon delivering to `sink`.
    pub fn new(
        scheduler: Arc<EmissionScheduler>,
        sink: Arc<dyn SampleSink>,
        config: EmissionDaemonConfig,
    ) -> Self {
        Self {
            scheduler,
            sink,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Drive due times from `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn EmissionClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run until `shutdown` is cancelled (or the queue empties, if configured).
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            idle_wait_ms = self.config.idle_wait.as_millis() as u64,
            "Emission daemon starting"
        );

        loop {
            let now = self.clock.now();
            let next_due = self.scheduler.drain(now, self.sink.as_ref());

            let wait = match next_due {
                Some(due) => self.clock.until(due).min(self.config.idle_wait),
                None if self.config.stop_when_empty => {
                    info!("Queue empty, emission daemon stopping");
                    break;
                }
                None => self.config.idle_wait,
            };

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Emission daemon shutting down");
                    break;
                }

                _ = self.scheduler.notified() => {
                    debug!("Earlier entry scheduled, re-checking queue");
                }

                _ = tokio::time::sleep(wait) => {}
            }
        }

        let snapshot = self.scheduler.metrics().snapshot();
        info!(
            delivered = snapshot.delivered,
            stale_discarded = snapshot.stale_discarded,
            pending = self.scheduler.pending(),
            "Emission daemon stopped"
        );
    }
}
