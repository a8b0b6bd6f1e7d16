//! Sync markers: one-shot payloads bound to a vertex.
//!
//! A marker is attached to the first non-edge sample produced at its vertex
//! and is consumed at that moment. The arena owns the consumed flags; the
//! integrator borrows it mutably for one run, so no marker state leaks
//! between runs or jobs.

use serde_json::Value;

#[derive(Debug, Clone)]
struct Slot {
    payload: Value,
    consumed: bool,
}

/// Vertex-indexed marker storage with consumed flags.
#[derive(Debug, Clone, Default)]
pub struct SyncArena {
    slots: Vec<Option<Slot>>,
}

impl SyncArena {
    /// Build an arena from one optional payload per vertex.
    pub fn new(payloads: Vec<Option<Value>>) -> Self {
        Self {
            slots: payloads
                .into_iter()
                .map(|p| {
                    p.map(|payload| Slot {
                        payload,
                        consumed: false,
                    })
                })
                .collect(),
        }
    }

    /// Build an arena for a re-indexed path.
    ///
    /// `index_map[i]` is the new index of original vertex `i`. Markers follow
    /// their vertex; consumed flags are carried over.
    pub fn reindex(self, index_map: &[usize], new_len: usize) -> Self {
        let mut slots: Vec<Option<Slot>> = vec![None; new_len];
        for (old, slot) in self.slots.into_iter().enumerate() {
            if let (Some(slot), Some(&new)) = (slot, index_map.get(old)) {
                if new < new_len {
                    slots[new] = Some(slot);
                }
            }
        }
        Self { slots }
    }

    /// True if an unconsumed marker sits on `vertex`.
    pub fn is_pending(&self, vertex: usize) -> bool {
        matches!(self.slots.get(vertex), Some(Some(slot)) if !slot.consumed)
    }

    /// Take the marker at `vertex`, marking it consumed.
    ///
    /// Returns `None` if there is no marker or it was already taken.
    pub fn take(&mut self, vertex: usize) -> Option<Value> {
        match self.slots.get_mut(vertex) {
            Some(Some(slot)) if !slot.consumed => {
                slot.consumed = true;
                Some(slot.payload.clone())
            }
            _ => None,
        }
    }

    /// Number of markers not yet consumed.
    pub fn pending(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Some(slot) if !slot.consumed))
            .count()
    }

    /// Total number of markers.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True if the arena holds no marker.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
