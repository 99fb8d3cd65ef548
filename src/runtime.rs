//! Client runtime.
//!
//! Owns the live component instances, the dirty-instance scheduler and
//! the client DOM. Everything stateful meets here: mounting realizes a
//! virtual tree into DOM and brings instances to life, `set_state`
//! coalesces re-renders through the scheduler, `flush` diffs and patches
//! every dirty instance exactly once, and `dispatch` routes a DOM event
//! through an element's declarative binding to a handler in the owning
//! component's table.
//!
//! The runtime is the `PatchHost`: when a patch inserts a subtree it
//! realizes it here (creating instances for component references), and
//! when a patch removes one it unmounts every instance living inside.

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::component::{Event, HandlerCtx, Instance, InstanceId};
use crate::diff::{EditOp, EditScript, diff};
use crate::dom::{DomHandle, DomNode, visit_elements};
use crate::error::{RuntimeError, RuntimeResult};
use crate::hooks::{HookStore, SlotRef};
use crate::node::VNode;
use crate::patch::{self, PatchHost};
use crate::props::{Props, StateMap, Value};
use crate::render::{AttrTarget, MAX_RENDER_DEPTH, apply_attrs};
use crate::registry::{ComponentDef, SharedRegistry};
use crate::schedule::Scheduler;

/// Client-side runtime: instance table, scheduler and DOM in one place.
pub struct Runtime {
    registry: SharedRegistry,
    instances: FxHashMap<InstanceId, Instance>,
    scheduler: Scheduler,
    next_instance: u64,
    /// Instance whose render is currently being realized; fresh elements
    /// are stamped with it so dispatch can find its handler table.
    current_owner: Option<InstanceId>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("instances", &self.instances.len())
            .field("pending", &self.scheduler.pending())
            .finish()
    }
}

impl Runtime {
    /// Create a runtime resolving components through the given registry.
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            instances: FxHashMap::default(),
            scheduler: Scheduler::new(),
            next_instance: 0,
            current_owner: None,
        }
    }

    /// Register a component definition.
    pub fn register(&mut self, def: ComponentDef) -> RuntimeResult<()> {
        self.registry.register(def)
    }

    /// The registry this runtime resolves through.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Look up a live instance.
    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Check whether an instance has a queued re-render.
    pub fn is_dirty(&self, id: InstanceId) -> bool {
        self.scheduler.is_scheduled(id)
    }

    // =========================================================================
    // Mounting
    // =========================================================================

    /// Realize a virtual tree into live DOM, creating an instance for
    /// every resolvable component reference in it.
    pub fn mount(&mut self, node: &VNode) -> RuntimeResult<DomHandle> {
        self.current_owner = None;
        self.realize_node(node, 0)
    }

    /// Mount one component directly. Unlike an inline reference, an
    /// unknown name here is an error.
    pub fn mount_component(
        &mut self,
        name: &str,
        props: Props,
    ) -> RuntimeResult<(InstanceId, DomHandle)> {
        if self.registry.get(name).is_none() {
            return Err(RuntimeError::UnknownComponent(name.into()));
        }
        let id = self.create_instance(name, props)?;
        let root = self.render_instance(id)?;
        self.finalize_mount(id);
        Ok((id, root))
    }

    fn create_instance(&mut self, name: &str, props: Props) -> RuntimeResult<InstanceId> {
        let def = self
            .registry
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownComponent(name.into()))?;
        self.next_instance += 1;
        let id = InstanceId::from_raw(self.next_instance);
        let behavior = (def.ctor)(&props);
        let instance = Instance::new(id, name.into(), props, behavior, HookStore::new());
        self.instances.insert(id, instance);
        Ok(id)
    }

    /// Render an instance's tree and realize it, normalized to a single
    /// root element (non-element roots get a `div` container).
    fn render_instance(&mut self, id: InstanceId) -> RuntimeResult<DomHandle> {
        let mut instance = self
            .instances
            .remove(&id)
            .ok_or(RuntimeError::UnknownInstance(id.as_raw()))?;
        let tree = instance.render_tree();
        self.instances.insert(id, instance);

        let prev_owner = self.current_owner.replace(id);
        let result = self.realize_root(&tree, id);
        self.current_owner = prev_owner;
        let root = result?;

        if let Some(instance) = self.instances.get_mut(&id) {
            instance.rendered = Some(tree);
            instance.root = Some(root.clone());
        }
        Ok(root)
    }

    fn realize_root(&mut self, tree: &VNode, owner: InstanceId) -> RuntimeResult<DomHandle> {
        let root = match tree {
            VNode::Element(_) => self.realize_node(tree, 0)?,
            // Text, fragment and nested-component roots get a container so
            // the instance always owns exactly one element.
            other => {
                let wrapper = DomNode::element("div");
                let child = self.realize_node(other, 1)?;
                if let Some(elem) = wrapper.borrow_mut().as_element_mut() {
                    elem.children = vec![child];
                    elem.instance = Some(owner);
                }
                wrapper
            }
        };
        if let Some(elem) = root.borrow_mut().as_element_mut()
            && elem.instance.is_none()
        {
            elem.instance = Some(owner);
        }
        Ok(root)
    }

    fn realize_node(&mut self, node: &VNode, depth: usize) -> RuntimeResult<DomHandle> {
        if depth > MAX_RENDER_DEPTH {
            return Err(RuntimeError::DepthExceeded { max: MAX_RENDER_DEPTH });
        }
        match node {
            VNode::Text(content) => Ok(DomNode::text(content.clone())),
            VNode::Element(elem) => {
                let handle = DomNode::element(elem.tag.clone());
                {
                    let mut dom = handle.borrow_mut();
                    if let Some(target) = dom.as_element_mut() {
                        apply_attrs(target, &elem.props, &AttrTarget::Client);
                        target.instance = self.current_owner;
                    }
                }
                let mut children = Vec::with_capacity(elem.children.len());
                for child in &elem.children {
                    children.push(self.realize_node(child, depth + 1)?);
                }
                if let Some(target) = handle.borrow_mut().as_element_mut() {
                    target.children = children;
                }
                Ok(handle)
            }
            VNode::Fragment(frag) => {
                // Only reachable at a tree root (construction flattens
                // nested fragments); the client owns one handle per
                // subtree, so root fragments get a container here.
                let wrapper = DomNode::element("div");
                let mut children = Vec::with_capacity(frag.children.len());
                for child in &frag.children {
                    children.push(self.realize_node(child, depth + 1)?);
                }
                if let Some(target) = wrapper.borrow_mut().as_element_mut() {
                    target.children = children;
                    target.instance = self.current_owner;
                }
                Ok(wrapper)
            }
            VNode::Component(comp) => {
                if self.registry.get(&comp.name).is_none() {
                    // Permissive: an unknown name renders as empty content.
                    tracing::warn!(
                        component = %comp.name,
                        "unresolved component reference, rendering nothing"
                    );
                    return Ok(DomNode::text(""));
                }
                let id = self.create_instance(&comp.name, comp.props.clone())?;
                let root = self.render_instance(id)?;
                self.finalize_mount(id);
                Ok(root)
            }
        }
    }

    /// Flip the instance to mounted and fire `did_mount`. Children reach
    /// this point before their parents.
    fn finalize_mount(&mut self, id: InstanceId) {
        if let Some(instance) = self.instances.get_mut(&id)
            && !instance.mounted
        {
            instance.mounted = true;
            instance.behavior.did_mount();
        }
    }

    // =========================================================================
    // State and props
    // =========================================================================

    /// Write one state key. The instance re-renders at the next `flush`;
    /// any number of writes between flushes coalesce into one render.
    /// `did_update` fires synchronously, before the re-render.
    pub fn set_state(
        &mut self,
        id: InstanceId,
        key: impl Into<CompactString>,
        value: impl Into<Value>,
    ) -> RuntimeResult<()> {
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownInstance(id.as_raw()))?;
        if instance.apply_state(key.into(), value.into()) {
            self.scheduler.schedule(id);
        }
        Ok(())
    }

    /// Merge new props into an instance (wholesale per key), scheduling a
    /// re-render when mounted.
    pub fn set_props(&mut self, id: InstanceId, props: Props) -> RuntimeResult<()> {
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownInstance(id.as_raw()))?;
        if instance.apply_props(props) {
            self.scheduler.schedule(id);
        }
        Ok(())
    }

    /// Write a hook state slot, scheduling a re-render when the value
    /// actually changed.
    pub fn set_hook_state(
        &mut self,
        id: InstanceId,
        slot: SlotRef,
        value: Value,
    ) -> RuntimeResult<()> {
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownInstance(id.as_raw()))?;
        if instance.hooks.set_slot(slot, value) && instance.mounted {
            self.scheduler.schedule(id);
        }
        Ok(())
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Route an event through the element's declarative binding.
    ///
    /// Returns `false` when the element has no binding for the event or
    /// the bound method is missing from the handler table. State writes
    /// queued by the handler go through the normal `set_state` path.
    pub fn dispatch(&mut self, target: &DomHandle, event: &Event) -> RuntimeResult<bool> {
        let Some((method, owner)) = ({
            let node = target.borrow();
            node.as_element().and_then(|elem| {
                let method = elem.binding_for(&event.name)?.clone();
                Some((method, elem.instance))
            })
        }) else {
            return Ok(false);
        };
        let Some(owner) = owner else {
            tracing::warn!(event = %event.name, "binding on an element with no owning instance");
            return Ok(false);
        };

        let pending = {
            let instance = self
                .instances
                .get(&owner)
                .ok_or(RuntimeError::UnknownInstance(owner.as_raw()))?;
            let def = self
                .registry
                .get(instance.name())
                .ok_or_else(|| RuntimeError::UnknownComponent(instance.name().into()))?;
            let Some(handler) = def.handler(&method) else {
                tracing::warn!(
                    component = instance.name(),
                    method = %method,
                    "bound handler method is not in the component's table"
                );
                return Ok(false);
            };
            let mut ctx = HandlerCtx::new(event, &instance.props, &instance.state);
            handler(&mut ctx);
            ctx.into_pending()
        };

        for (key, value) in pending {
            self.set_state(owner, key, value)?;
        }
        Ok(true)
    }

    // =========================================================================
    // Flush
    // =========================================================================

    /// Re-render every dirty instance once: render, diff against the
    /// previous tree, patch the instance's DOM subtree in place. Returns
    /// the number of instances re-rendered.
    ///
    /// A failing instance does not starve the rest of the queue: every
    /// dirty instance gets its render, and the first error surfaces after
    /// the tick completes.
    pub fn flush(&mut self) -> RuntimeResult<usize> {
        let dirty = self.scheduler.drain();
        let mut rendered = 0;
        let mut first_err = None;

        for id in dirty {
            match self.rerender_now(id) {
                Ok(true) => rendered += 1,
                // Unmounted between schedule and flush.
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(instance = %id, error = %err, "re-render failed");
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(rendered),
        }
    }

    /// Render one instance synchronously and patch its DOM subtree.
    /// Returns `false` when the id no longer refers to a live instance.
    /// On error the previous tree stays in place, so a later render diffs
    /// against what the DOM actually shows.
    fn rerender_now(&mut self, id: InstanceId) -> RuntimeResult<bool> {
        let Some(mut instance) = self.instances.remove(&id) else {
            return Ok(false);
        };
        let new_tree = instance.render_tree();
        let root = instance.root.clone();
        let script = diff(instance.rendered.as_ref(), Some(&new_tree));
        self.instances.insert(id, instance);
        let script = script?;

        if let Some(root) = root {
            let prev_owner = self.current_owner.replace(id);
            let result = patch::apply(self, &root, &script);
            self.current_owner = prev_owner;
            result?;
        }

        if let Some(instance) = self.instances.get_mut(&id) {
            instance.rendered = Some(new_tree);
        }
        Ok(true)
    }

    // =========================================================================
    // Unmount
    // =========================================================================

    /// Tear an instance down: `will_unmount`, effect cleanups, removal
    /// from the table, plus every instance nested in its DOM subtree.
    /// Terminal; the id is never valid again.
    pub fn unmount(&mut self, id: InstanceId) -> RuntimeResult<()> {
        let mut instance = self
            .instances
            .remove(&id)
            .ok_or(RuntimeError::UnknownInstance(id.as_raw()))?;
        self.scheduler.cancel(id);
        instance.teardown();
        if let Some(root) = instance.root.take() {
            self.retire_subtree(&root);
        }
        Ok(())
    }

    fn retire_subtree(&mut self, handle: &DomHandle) {
        let mut ids = Vec::new();
        visit_elements(handle, &mut |h| {
            if let Some(id) = h.borrow().as_element().and_then(|e| e.instance)
                && !ids.contains(&id)
            {
                ids.push(id);
            }
            true
        });
        for id in ids {
            if self.instances.contains_key(&id) {
                let _ = self.unmount(id);
            }
        }
    }

    // =========================================================================
    // Hydration adoption
    // =========================================================================

    /// Bring an instance to life on top of existing DOM: the recorded
    /// state replaces `initial_state`, the tree is rendered once to seed
    /// future diffs, and the instance is mounted without `did_mount`
    /// (the mount already happened on the server).
    pub(crate) fn adopt_instance(
        &mut self,
        name: &str,
        props: Props,
        state: StateMap,
        root: DomHandle,
    ) -> RuntimeResult<InstanceId> {
        let id = self.create_instance(name, props)?;
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownInstance(id.as_raw()))?;
        instance.state = state;
        instance.mounted = true;
        instance.root = Some(root);

        // Seed the previous-tree slot without touching the DOM. Effects
        // run here (their first client-side chance), did_mount does not.
        let tree = instance.render_tree();
        instance.rendered = Some(tree);
        Ok(id)
    }

    /// Mark a hydrated element as belonging to an instance.
    pub(crate) fn stamp_owner(&self, handle: &DomHandle, id: InstanceId) {
        if let Some(elem) = handle.borrow_mut().as_element_mut() {
            elem.instance = Some(id);
        }
    }
}

// =============================================================================
// PatchHost
// =============================================================================

impl PatchHost for Runtime {
    fn realize(&mut self, node: &VNode) -> RuntimeResult<DomHandle> {
        self.realize_node(node, 0)
    }

    fn retire(&mut self, handle: &DomHandle) {
        self.retire_subtree(handle);
    }

    fn relocated(&mut self, from: &DomHandle, to: &DomHandle) {
        for instance in self.instances.values_mut() {
            if let Some(root) = &instance.root
                && std::rc::Rc::ptr_eq(root, from)
            {
                instance.root = Some(to.clone());
            }
        }
    }

    fn forward_slot(&mut self, target: &DomHandle, script: &EditScript) -> RuntimeResult<bool> {
        let owner = target.borrow().as_element().and_then(|e| e.instance);
        let Some(owner) = owner else {
            return Ok(false);
        };
        if self.current_owner == Some(owner) {
            return Ok(false);
        }
        let is_instance_root = self
            .instances
            .get(&owner)
            .and_then(|i| i.root.as_ref())
            .is_some_and(|root| std::rc::Rc::ptr_eq(root, target));
        if !is_instance_root {
            return Ok(false);
        }

        // The prop set at the child's slot is authoritative on parent
        // re-render: replace wholesale, then let the child diff its own
        // subtree.
        for op in script {
            if let EditOp::UpdateProps(props) = op
                && let Some(instance) = self.instances.get_mut(&owner)
            {
                instance.replace_props(props.clone());
            }
        }
        self.rerender_now(owner)?;
        Ok(true)
    }
}
