//! Due-time queue for pending emissions.
//!
//! Entries are ordered by due instant (earliest first), then by insertion
//! order. Two samples due at the same instant therefore come out in the order
//! they were scheduled, which keeps a job's own samples in sequence even when
//! a dwell produces identical timestamps.
//!
//! The queue is internal to the scheduler, which keeps it behind the same
//! lock as the version map.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::{DateTime, Utc};

use super::job::EntityId;
use crate::synth::Sample;

// =============================================================================
// Sequence Number Generator
// =============================================================================

/// Global sequence counter for FIFO ordering within the same due instant.
static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    SEQUENCE_COUNTER.fetch_add(1, AtomicOrdering::Relaxed)
}

// =============================================================================
// Queued Emission
// =============================================================================

/// One sample waiting for its due instant.
#[derive(Debug, Clone)]
pub struct QueuedEmission {
    /// Entity the sample belongs to.
    pub entity: EntityId,

    /// Job version the sample was scheduled under.
    pub version: u64,

    /// Wall-clock instant the sample is due.
    pub due: DateTime<Utc>,

    /// The sample itself.
    pub sample: Sample,

    /// Insertion order, for ties on `due`.
    sequence: u64,
}

impl QueuedEmission {
    /// Create an entry. The sequence number is assigned automatically.
    pub fn new(entity: EntityId, version: u64, due: DateTime<Utc>, sample: Sample) -> Self {
        Self {
            entity,
            version,
            due,
            sample,
            sequence: next_sequence(),
        }
    }
}

// Ordering for BinaryHeap: earliest due first, then lower sequence first
impl PartialEq for QueuedEmission {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.sequence == other.sequence
    }
}

impl Eq for QueuedEmission {}

impl PartialOrd for QueuedEmission {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEmission {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse both keys
        match other.due.cmp(&self.due) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ordering => ordering,
        }
    }
}

// =============================================================================
// Emission Queue
// =============================================================================

/// Min-heap of pending emissions.
#[derive(Default)]
pub struct EmissionQueue {
    heap: BinaryHeap<QueuedEmission>,
}

impl EmissionQueue {
    /// Add an entry.
    pub fn push(&mut self, entry: QueuedEmission) {
        self.heap.push(entry);
    }

    /// Remove and return the earliest entry if it is due at `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<QueuedEmission> {
        if self.heap.peek()?.due <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Due instant of the earliest entry.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|e| e.due)
    }

    /// Number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

impl std::fmt::Debug for EmissionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmissionQueue")
            .field("len", &self.heap.len())
            .field("next_due", &self.next_due())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
