//! Re-render scheduling.
//!
//! State writes never re-render immediately: the runtime marks the
//! instance dirty here and the next `flush` re-renders every dirty
//! instance exactly once. This gives `set_state` its coalescing
//! semantics: any number of writes to an instance between flushes costs
//! one render.
//!
//! The flush boundary is explicit. A browser embedding would drive it
//! from an animation-frame callback; tests and servers call it directly.

use crate::component::InstanceId;

/// Dirty-instance queue drained by the runtime's flush.
#[derive(Debug, Default)]
pub struct Scheduler {
    /// Dirty instances in first-marked order
    dirty: Vec<InstanceId>,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an instance dirty. Marking an already-dirty instance is a
    /// no-op, which is what coalesces repeated state writes.
    pub fn schedule(&mut self, id: InstanceId) {
        if !self.dirty.contains(&id) {
            self.dirty.push(id);
        }
    }

    /// Drop an instance from the queue (it unmounted before the flush).
    pub fn cancel(&mut self, id: InstanceId) {
        self.dirty.retain(|d| *d != id);
    }

    /// Check whether an instance is queued.
    pub fn is_scheduled(&self, id: InstanceId) -> bool {
        self.dirty.contains(&id)
    }

    /// Number of queued instances.
    pub fn pending(&self) -> usize {
        self.dirty.len()
    }

    /// Take the queue, leaving it empty.
    pub fn drain(&mut self) -> Vec<InstanceId> {
        std::mem::take(&mut self.dirty)
    }
}
