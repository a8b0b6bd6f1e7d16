//! Versioned emission scheduler.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::{debug, info, trace};

use super::job::{EmissionJob, EntityId};
use super::metrics::SchedulerMetrics;
use super::queue::{EmissionQueue, QueuedEmission};
use super::sink::SampleSink;

#[derive(Default)]
struct State {
    queue: EmissionQueue,
    versions: HashMap<EntityId, u64>,
}

impl State {
    /// Bump the version of `entity`, returning (new version, had a previous one).
    fn bump(&mut self, entity: &EntityId) -> (u64, bool) {
        match self.versions.get_mut(entity) {
            Some(version) => {
                *version += 1;
                (*version, true)
            }
            None => {
                self.versions.insert(entity.clone(), 1);
                (1, false)
            }
        }
    }

    fn is_current(&self, entry: &QueuedEmission) -> bool {
        self.versions.get(&entry.entity) == Some(&entry.version)
    }
}

/// Delivers samples of many entities at their due instants.
///
/// Each entity has a monotonically increasing version. Scheduling a new job
/// for an entity bumps its version; entries of older versions stay queued
/// but are discarded when they come due. Version bumps, insertions and
/// draining all happen under one lock, so once `schedule` returns, no sample
/// of the replaced job can reach the sink.
pub struct EmissionScheduler {
    state: Mutex<State>,
    metrics: SchedulerMetrics,
    wakeup: Notify,
}

impl Default for EmissionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EmissionScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            metrics: SchedulerMetrics::new(),
            wakeup: Notify::new(),
        }
    }

    /// Schedule `job` for `entity`, superseding any earlier job.
    ///
    /// Returns the new version.
    pub fn schedule(&self, entity: impl Into<EntityId>, job: EmissionJob) -> u64 {
        let entity = entity.into();
        let entries = job.len();
        let (samples, base) = job.into_parts();

        let mut state = self.state.lock();
        let (version, superseded) = state.bump(&entity);
        let previous_due = state.queue.next_due();
        let mut earliest: Option<DateTime<Utc>> = None;

        for sample in samples {
            let due = base + super::job::seconds(sample.elapsed);
            earliest = Some(earliest.map_or(due, |e| e.min(due)));
            state
                .queue
                .push(QueuedEmission::new(entity.clone(), version, due, sample));
        }
        drop(state);

        self.metrics.job_scheduled(entries, superseded);

        let wake = match (earliest, previous_due) {
            (Some(new), Some(old)) => new < old,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if wake {
            self.wakeup.notify_one();
        }

        info!(
            entity = %entity,
            version,
            samples = entries,
            superseded,
            "Job scheduled"
        );
        version
    }

    /// Cancel all pending deliveries of `entity`.
    ///
    /// The version is bumped without inserting anything, so every queued
    /// entry of the entity becomes stale. Returns the new version, or `None`
    /// if the entity was never scheduled.
    pub fn retire(&self, entity: &EntityId) -> Option<u64> {
        let version = {
            let mut state = self.state.lock();
            if !state.versions.contains_key(entity) {
                return None;
            }
            state.bump(entity).0
        };
        self.metrics.entity_retired();
        debug!(entity = %entity, version, "Entity retired");
        Some(version)
    }

    /// Deliver every entry due at or before `now` to `sink`.
    ///
    /// Stale entries are dropped. Returns the due instant of the earliest
    /// entry left, if any.
    ///
    /// `sink` is called with the scheduler lock held. A sink that calls back
    /// into this scheduler deadlocks; one that blocks stalls every producer.
    pub fn drain(&self, now: DateTime<Utc>, sink: &dyn SampleSink) -> Option<DateTime<Utc>> {
        let mut state = self.state.lock();
        while let Some(entry) = state.queue.pop_due(now) {
            if state.is_current(&entry) {
                sink.publish(&entry.entity, &entry.sample);
                self.metrics.sample_delivered();
            } else {
                trace!(
                    entity = %entry.entity,
                    version = entry.version,
                    elapsed = entry.sample.elapsed,
                    "Discarding stale entry"
                );
                self.metrics.stale_discarded();
            }
        }
        state.queue.next_due()
    }

    /// Current version of `entity`.
    pub fn current_version(&self, entity: &EntityId) -> Option<u64> {
        self.state.lock().versions.get(entity).copied()
    }

    /// Entries still queued, stale ones included.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Due instant of the earliest queued entry.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.state.lock().queue.next_due()
    }

    /// Scheduler counters.
    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    /// Resolves when a `schedule` call inserted an entry earlier than
    /// everything queued before it.
    pub fn notified(&self) -> Notified<'_> {
        self.wakeup.notified()
    }
}

impl std::fmt::Debug for EmissionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EmissionScheduler")
            .field("queue", &state.queue)
            .field("entities", &state.versions.len())
            .finish()
    }
}
