//! Hook slots for component instances.
//!
//! Slots are addressed by call order within `render`: the Nth hook call
//! of a render reads and writes the Nth slot. Call order must therefore
//! be identical on every render of the same instance (no hooks behind
//! changing branches). Unlike the usual silent-corruption failure mode,
//! each slot is tagged with its hook kind and the tag sequence is
//! validated against the previous render: a mismatch panics in debug
//! builds and logs an error (resetting the slot) in release builds.
//!
//! Memo and effect slots key their dependencies by a blake3 hash of the
//! dependencies' JSON serialization.

use crate::props::Value;

/// Cleanup closure returned by an effect, run when its dependencies
/// change and when the instance unmounts.
pub type EffectCleanup = Box<dyn FnMut()>;

/// Hook kind tag, validated across renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookTag {
    State,
    Effect,
    Memo,
}

/// Stable reference to a state slot, valid for the lifetime of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef(usize);

impl SlotRef {
    /// Slot index (call order within `render`).
    pub fn index(&self) -> usize {
        self.0
    }
}

// =============================================================================
// Slots
// =============================================================================

struct HookSlot {
    tag: HookTag,
    /// Current value (state slots) or cached result (memo slots)
    value: Value,
    /// Dependency hash for memo/effect slots
    deps: Option<[u8; 32]>,
    /// Pending cleanup for effect slots
    cleanup: Option<EffectCleanup>,
}

impl std::fmt::Debug for HookSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSlot")
            .field("tag", &self.tag)
            .field("value", &self.value)
            .field("has_deps", &self.deps.is_some())
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

impl HookSlot {
    fn new(tag: HookTag) -> Self {
        Self {
            tag,
            value: Value::Null,
            deps: None,
            cleanup: None,
        }
    }
}

/// Hash a dependency list for slot invalidation.
fn dep_hash(deps: &[Value]) -> [u8; 32] {
    let bytes = serde_json::to_vec(deps).unwrap_or_default();
    *blake3::hash(&bytes).as_bytes()
}

// =============================================================================
// HookStore
// =============================================================================

/// Ordered hook storage for one component instance.
#[derive(Debug, Default)]
pub struct HookStore {
    slots: Vec<HookSlot>,
    cursor: usize,
    /// Whether effect callbacks execute (true on the client; the server
    /// pass records dependency hashes but never runs effects)
    run_effects: bool,
    /// Slot count of the completed previous render, for shape validation
    expected_len: Option<usize>,
}

impl HookStore {
    /// Create a store that executes effects (client rendering).
    pub fn new() -> Self {
        Self {
            run_effects: true,
            ..Default::default()
        }
    }

    /// Create a store that records effects without executing them
    /// (server rendering).
    pub fn inert() -> Self {
        Self {
            run_effects: false,
            ..Default::default()
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no hooks have been called yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reset the cursor for a new render pass.
    pub fn begin_render(&mut self) {
        self.cursor = 0;
    }

    /// Finish a render pass, validating that the same number of hooks ran
    /// as on the previous render.
    pub fn end_render(&mut self) {
        if let Some(expected) = self.expected_len
            && self.cursor != expected
        {
            self.shape_mismatch(format_args!(
                "render used {} hook slots, previous render used {expected}",
                self.cursor
            ));
        }
        self.expected_len = Some(self.cursor);
    }

    /// Claim the next slot, validating its tag against the previous render.
    fn next_slot(&mut self, tag: HookTag) -> usize {
        let index = self.cursor;
        self.cursor += 1;

        if index < self.slots.len() {
            let found = self.slots[index].tag;
            if found != tag {
                self.shape_mismatch(format_args!(
                    "slot {index}: expected {found:?} (previous render), found {tag:?}"
                ));
                // Release builds recover by resetting the slot.
                self.slots[index] = HookSlot::new(tag);
            }
        } else {
            self.slots.push(HookSlot::new(tag));
        }
        index
    }

    fn shape_mismatch(&self, msg: std::fmt::Arguments<'_>) {
        if cfg!(debug_assertions) {
            panic!("hook order violation: {msg}");
        }
        tracing::error!("hook order violation: {msg}");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hook operations
    // ─────────────────────────────────────────────────────────────────────────

    /// State slot: returns the current value and a stable reference for
    /// later writes. The initializer runs only on the first render.
    pub fn use_state(&mut self, init: impl FnOnce() -> Value) -> (Value, SlotRef) {
        let index = self.next_slot(HookTag::State);
        let slot = &mut self.slots[index];
        if slot.deps.is_none() {
            slot.value = init();
            // Mark initialized; state slots carry no real dependency hash.
            slot.deps = Some([0; 32]);
        }
        (slot.value.clone(), SlotRef(index))
    }

    /// Memo slot: recompute only when the dependency hash changes.
    pub fn use_memo(&mut self, deps: &[Value], compute: impl FnOnce() -> Value) -> Value {
        let index = self.next_slot(HookTag::Memo);
        let hash = dep_hash(deps);
        let slot = &mut self.slots[index];
        if slot.deps != Some(hash) {
            slot.value = compute();
            slot.deps = Some(hash);
        }
        slot.value.clone()
    }

    /// Effect slot: run on first render and whenever the dependency hash
    /// changes, after running the previous cleanup. Inert stores record
    /// the hash without executing anything.
    pub fn use_effect(
        &mut self,
        deps: &[Value],
        effect: impl FnOnce() -> Option<EffectCleanup>,
    ) {
        let index = self.next_slot(HookTag::Effect);
        let hash = dep_hash(deps);
        let slot = &mut self.slots[index];
        if slot.deps == Some(hash) {
            return;
        }
        slot.deps = Some(hash);
        if !self.run_effects {
            return;
        }
        let slot = &mut self.slots[index];
        if let Some(mut cleanup) = slot.cleanup.take() {
            cleanup();
        }
        slot.cleanup = effect();
    }

    /// Read a state slot directly (outside render).
    pub fn slot_value(&self, slot: SlotRef) -> Option<&Value> {
        self.slots.get(slot.index()).map(|s| &s.value)
    }

    /// Write a state slot directly (outside render). Returns true if the
    /// slot exists and the value changed.
    pub fn set_slot(&mut self, slot: SlotRef, value: Value) -> bool {
        match self.slots.get_mut(slot.index()) {
            Some(s) if s.value != value => {
                s.value = value;
                true
            }
            _ => false,
        }
    }

    /// Run all pending effect cleanups (instance unmount).
    pub fn run_cleanups(&mut self) {
        for slot in &mut self.slots {
            if let Some(mut cleanup) = slot.cleanup.take() {
                cleanup();
            }
        }
    }
}
