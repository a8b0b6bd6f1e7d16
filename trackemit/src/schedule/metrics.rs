//! Scheduler counters.
//!
//! Lock-free atomic counters updated by the scheduler, read through a
//! point-in-time [`MetricsSnapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for an [`EmissionScheduler`](super::EmissionScheduler).
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    jobs_scheduled: AtomicU64,
    jobs_superseded: AtomicU64,
    entities_retired: AtomicU64,
    entries_queued: AtomicU64,
    delivered: AtomicU64,
    stale_discarded: AtomicU64,
}

impl SchedulerMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn job_scheduled(&self, entries: usize, superseded: bool) {
        self.jobs_scheduled.fetch_add(1, Ordering::Relaxed);
        self.entries_queued
            .fetch_add(entries as u64, Ordering::Relaxed);
        if superseded {
            self.jobs_superseded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn entity_retired(&self) {
        self.entities_retired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sample_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stale_discarded(&self) {
        self.stale_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_scheduled: self.jobs_scheduled.load(Ordering::Relaxed),
            jobs_superseded: self.jobs_superseded.load(Ordering::Relaxed),
            entities_retired: self.entities_retired.load(Ordering::Relaxed),
            entries_queued: self.entries_queued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SchedulerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Jobs accepted by `schedule`.
    pub jobs_scheduled: u64,
    /// Jobs that replaced an earlier version for the same entity.
    pub jobs_superseded: u64,
    /// `retire` calls on known entities.
    pub entities_retired: u64,
    /// Entries inserted into the queue.
    pub entries_queued: u64,
    /// Samples handed to the sink.
    pub delivered: u64,
    /// Entries dropped because their version was no longer current.
    pub stale_discarded: u64,
}

impl MetricsSnapshot {
    /// Entries neither delivered nor discarded yet.
    pub fn outstanding(&self) -> u64 {
        self.entries_queued
            .saturating_sub(self.delivered + self.stale_discarded)
    }
}
