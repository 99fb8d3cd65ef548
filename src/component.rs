//! Component behavior and live instances.
//!
//! A `Component` implementation is the stateless behavior of a component
//! type: it builds a virtual tree from the current props and state and
//! receives lifecycle notifications. The `Instance` is the live, stateful
//! object bound to exactly one position in the rendered tree: it owns the
//! props, the state map, the hook slots and the mounted flag.
//!
//! Lifecycle per instance: Unmounted → Mounted → Unmounted, terminal.
//! `did_mount` fires once after the first (always synchronous) render;
//! re-renders of the same position reuse the instance and fire
//! `did_update`; removal fires `will_unmount` and discards the instance.

use compact_str::CompactString;

use crate::dom::DomHandle;
use crate::hooks::{EffectCleanup, HookStore, SlotRef};
use crate::node::VNode;
use crate::props::{Props, StateMap, Value};

/// Identifier of a live component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Create an id from a raw counter value.
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Component trait
// =============================================================================

/// Behavior of a component type.
///
/// All methods other than `render` have default no-op implementations,
/// matching how most components only care about rendering.
pub trait Component {
    /// Build the virtual tree for the current props and state.
    ///
    /// Hook calls through the scope must happen in the same order on
    /// every render of the same instance.
    fn render(&self, scope: &mut Scope<'_>) -> VNode;

    /// Seed the instance state when the component is first constructed.
    /// Hydration bypasses this and replays the server-recorded state.
    fn initial_state(&self, _props: &Props) -> StateMap {
        StateMap::new()
    }

    /// Called once, after the first render of a fresh mount.
    fn did_mount(&mut self) {}

    /// Called after every state or prop mutation while mounted, with the
    /// previous and next mapping (state maps for `set_state`, prop maps
    /// for `set_props`).
    fn did_update(&mut self, _prev: &StateMap, _next: &StateMap) {}

    /// Called when the instance's position leaves the tree.
    fn will_unmount(&mut self) {}
}

/// Constructor registered for a component name.
pub type Constructor = fn(&Props) -> Box<dyn Component>;

// =============================================================================
// Scope
// =============================================================================

/// Read view of an instance handed to `render`, plus its hook slots.
pub struct Scope<'a> {
    /// Current props
    pub props: &'a Props,
    /// Current state
    pub state: &'a StateMap,
    hooks: &'a mut HookStore,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(props: &'a Props, state: &'a StateMap, hooks: &'a mut HookStore) -> Self {
        Self { props, state, hooks }
    }

    /// Get a prop value.
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// Get a prop as a string slice.
    pub fn prop_str(&self, name: &str) -> Option<&str> {
        self.props.get(name).and_then(Value::as_str)
    }

    /// Get a state value.
    pub fn state_value(&self, name: &str) -> Option<&Value> {
        self.state.get(name)
    }

    /// Get a state value as an integer, defaulting when absent.
    pub fn state_i64(&self, name: &str, default: i64) -> i64 {
        self.state.get(name).and_then(Value::as_i64).unwrap_or(default)
    }

    /// State hook slot (call-order addressed).
    pub fn use_state(&mut self, init: impl FnOnce() -> Value) -> (Value, SlotRef) {
        self.hooks.use_state(init)
    }

    /// Memo hook slot.
    pub fn use_memo(&mut self, deps: &[Value], compute: impl FnOnce() -> Value) -> Value {
        self.hooks.use_memo(deps, compute)
    }

    /// Effect hook slot.
    pub fn use_effect(&mut self, deps: &[Value], effect: impl FnOnce() -> Option<EffectCleanup>) {
        self.hooks.use_effect(deps, effect);
    }
}

// =============================================================================
// Events and handlers
// =============================================================================

/// Dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// DOM event name (`click`)
    pub name: CompactString,
    /// Event payload
    pub detail: Value,
}

impl Event {
    /// Create an event with no payload.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            detail: Value::Null,
        }
    }

    /// Attach a payload.
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Handler entry in a component's typed handler table.
pub type HandlerFn = fn(&mut HandlerCtx<'_>);

/// Context handed to an event handler.
///
/// State writes are collected and applied through the runtime's normal
/// `set_state` path after the handler returns, so coalescing and
/// `did_update` semantics are identical to direct state mutation.
pub struct HandlerCtx<'a> {
    /// The dispatched event
    pub event: &'a Event,
    /// Current props
    pub props: &'a Props,
    /// Current state
    pub state: &'a StateMap,
    pending: Vec<(CompactString, Value)>,
}

impl<'a> HandlerCtx<'a> {
    pub(crate) fn new(event: &'a Event, props: &'a Props, state: &'a StateMap) -> Self {
        Self {
            event,
            props,
            state,
            pending: Vec::new(),
        }
    }

    /// Get a state value.
    pub fn state_value(&self, name: &str) -> Option<&Value> {
        self.state.get(name)
    }

    /// Get a state value as an integer, defaulting when absent.
    pub fn state_i64(&self, name: &str, default: i64) -> i64 {
        self.state.get(name).and_then(Value::as_i64).unwrap_or(default)
    }

    /// Queue a state write.
    pub fn set_state(&mut self, key: impl Into<CompactString>, value: impl Into<Value>) {
        self.pending.push((key.into(), value.into()));
    }

    pub(crate) fn into_pending(self) -> Vec<(CompactString, Value)> {
        self.pending
    }
}

// =============================================================================
// Instance
// =============================================================================

/// Live, stateful component bound to one position in the rendered tree.
pub struct Instance {
    id: InstanceId,
    name: CompactString,
    pub(crate) props: Props,
    pub(crate) state: StateMap,
    pub(crate) hooks: HookStore,
    pub(crate) mounted: bool,
    pub(crate) behavior: Box<dyn Component>,
    /// Tree produced by the last render, diffed against on re-render
    pub(crate) rendered: Option<VNode>,
    /// Root of the DOM subtree this instance owns
    pub(crate) root: Option<DomHandle>,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mounted", &self.mounted)
            .field("state", &self.state)
            .finish()
    }
}

impl Instance {
    pub(crate) fn new(
        id: InstanceId,
        name: CompactString,
        props: Props,
        behavior: Box<dyn Component>,
        hooks: HookStore,
    ) -> Self {
        let state = behavior.initial_state(&props);
        Self {
            id,
            name,
            props,
            state,
            hooks,
            mounted: false,
            behavior,
            rendered: None,
            root: None,
        }
    }

    /// Instance id.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Registered component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current props.
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Current state.
    pub fn state(&self) -> &StateMap {
        &self.state
    }

    /// Get one state value.
    pub fn state_value(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    /// Whether the instance is mounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Root of the owned DOM subtree.
    pub fn root(&self) -> Option<&DomHandle> {
        self.root.as_ref()
    }

    /// Run the behavior's render with this instance's props/state/hooks.
    pub(crate) fn render_tree(&mut self) -> VNode {
        self.hooks.begin_render();
        let mut scope = Scope::new(&self.props, &self.state, &mut self.hooks);
        let tree = self.behavior.render(&mut scope);
        self.hooks.end_render();
        tree
    }

    /// Mutate one state key, firing `did_update` when mounted. Returns
    /// whether the instance was mounted (i.e. whether a re-render is due).
    pub(crate) fn apply_state(&mut self, key: CompactString, value: Value) -> bool {
        let prev = self.state.clone();
        self.state.insert(key, value);
        if self.mounted {
            self.behavior.did_update(&prev, &self.state);
            true
        } else {
            false
        }
    }

    /// Replace the whole prop map, firing `did_update` when mounted.
    /// This is the parent-re-render path: the prop set at the child's
    /// slot is authoritative, stale keys do not survive.
    pub(crate) fn replace_props(&mut self, new_props: Props) -> bool {
        let prev = self.props.clone();
        self.props = new_props;
        if self.mounted {
            self.behavior.did_update(&prev, &self.props);
            true
        } else {
            false
        }
    }

    /// Shallow-merge new props, firing `did_update` when mounted.
    pub(crate) fn apply_props(&mut self, new_props: Props) -> bool {
        let prev = self.props.clone();
        for (key, value) in new_props {
            self.props.insert(key, value);
        }
        if self.mounted {
            self.behavior.did_update(&prev, &self.props);
            true
        } else {
            false
        }
    }

    /// Tear the instance down: `will_unmount`, effect cleanups, terminal.
    pub(crate) fn teardown(&mut self) {
        if self.mounted {
            self.behavior.will_unmount();
            self.mounted = false;
        }
        self.hooks.run_cleanups();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::VElement;
    use crate::props::props;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Probe {
        updates: Rc<Cell<usize>>,
        unmounts: Rc<Cell<usize>>,
    }

    impl Component for Probe {
        fn render(&self, scope: &mut Scope<'_>) -> VNode {
            VElement::new("p")
                .text(scope.prop_str("label").unwrap_or("?"))
                .into()
        }

        fn initial_state(&self, _props: &Props) -> StateMap {
            props([("count", 0)])
        }

        fn did_update(&mut self, _prev: &StateMap, _next: &StateMap) {
            self.updates.set(self.updates.get() + 1);
        }

        fn will_unmount(&mut self) {
            self.unmounts.set(self.unmounts.get() + 1);
        }
    }

    fn probe_instance() -> (Instance, Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let updates = Rc::new(Cell::new(0));
        let unmounts = Rc::new(Cell::new(0));
        let behavior = Box::new(Probe {
            updates: updates.clone(),
            unmounts: unmounts.clone(),
        });
        let inst = Instance::new(
            InstanceId::from_raw(1),
            "Probe".into(),
            props([("label", "hi")]),
            behavior,
            HookStore::new(),
        );
        (inst, updates, unmounts)
    }

    #[test]
    fn test_initial_state_seeded_from_behavior() {
        let (inst, _, _) = probe_instance();
        assert_eq!(inst.state_value("count"), Some(&Value::from(0)));
        assert!(!inst.is_mounted());
    }

    #[test]
    fn test_state_mutation_fires_did_update_only_while_mounted() {
        let (mut inst, updates, _) = probe_instance();

        assert!(!inst.apply_state("count".into(), Value::from(1)));
        assert_eq!(updates.get(), 0);

        inst.mounted = true;
        assert!(inst.apply_state("count".into(), Value::from(2)));
        assert_eq!(updates.get(), 1);
        assert_eq!(inst.state_value("count"), Some(&Value::from(2)));
    }

    #[test]
    fn test_set_props_is_shallow_merge() {
        let (mut inst, updates, _) = probe_instance();
        inst.mounted = true;

        inst.apply_props(props([("extra", "x")]));
        assert_eq!(inst.props().get("label"), Some(&Value::from("hi")));
        assert_eq!(inst.props().get("extra"), Some(&Value::from("x")));
        assert_eq!(updates.get(), 1);
    }

    #[test]
    fn test_replace_props_is_wholesale() {
        let (mut inst, updates, _) = probe_instance();
        inst.mounted = true;

        inst.replace_props(props([("other", "y")]));
        assert!(inst.props().get("label").is_none());
        assert_eq!(inst.props().get("other"), Some(&Value::from("y")));
        assert_eq!(updates.get(), 1);
    }

    #[test]
    fn test_teardown_is_terminal() {
        let (mut inst, _, unmounts) = probe_instance();
        inst.mounted = true;

        inst.teardown();
        assert!(!inst.is_mounted());
        assert_eq!(unmounts.get(), 1);

        // Second teardown must not fire the lifecycle again.
        inst.teardown();
        assert_eq!(unmounts.get(), 1);
    }
}
