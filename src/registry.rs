//! Component registry.
//!
//! Maps component names to their definitions: a constructor plus a typed
//! handler table. Rendering resolves `VNode::Component` references here,
//! and event dispatch resolves handler method names through the owning
//! definition's table.

use std::sync::Arc;

use compact_str::CompactString;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::component::{Constructor, HandlerFn};
use crate::error::{RuntimeError, RuntimeResult};

/// Definition of a component type.
#[derive(Clone, Copy)]
pub struct ComponentDef {
    /// Name used by `VNode::Component` references
    pub name: &'static str,
    /// Builds a fresh behavior object for a new instance
    pub ctor: Constructor,
    /// Handler methods addressable from event bindings
    pub handlers: &'static [(&'static str, HandlerFn)],
}

impl std::fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDef")
            .field("name", &self.name)
            .field("handlers", &self.handlers.iter().map(|(m, _)| m).collect::<Vec<_>>())
            .finish()
    }
}

impl ComponentDef {
    /// Look up a handler by method name.
    pub fn handler(&self, method: &str) -> Option<HandlerFn> {
        self.handlers
            .iter()
            .find(|(name, _)| *name == method)
            .map(|(_, f)| *f)
    }
}

// =============================================================================
// ComponentRegistry
// =============================================================================

/// Name-to-definition mapping.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    defs: FxHashMap<CompactString, ComponentDef>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Re-registering a name is an error.
    pub fn register(&mut self, def: ComponentDef) -> RuntimeResult<()> {
        let name = CompactString::from(def.name);
        if self.defs.contains_key(&name) {
            return Err(RuntimeError::DuplicateComponent(name));
        }
        self.defs.insert(name, def);
        Ok(())
    }

    /// Resolve a name to its definition.
    pub fn resolve(&self, name: &str) -> Option<&ComponentDef> {
        self.defs.get(name)
    }

    /// Check whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

// =============================================================================
// SharedRegistry
// =============================================================================

/// Thread-safe shared wrapper around a registry.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<ComponentRegistry>>,
}

impl SharedRegistry {
    /// Create an empty shared registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a function with read access.
    pub fn with_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ComponentRegistry) -> R,
    {
        f(&self.inner.read())
    }

    /// Execute a function with write access.
    pub fn with_write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ComponentRegistry) -> R,
    {
        f(&mut self.inner.write())
    }

    /// Register a definition.
    pub fn register(&self, def: ComponentDef) -> RuntimeResult<()> {
        self.with_write(|r| r.register(def))
    }

    /// Resolve a name, cloning the definition out of the lock.
    pub fn get(&self, name: &str) -> Option<ComponentDef> {
        self.with_read(|r| r.resolve(name).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, Scope};
    use crate::node::{VElement, VNode};
    use crate::props::Props;

    struct Null;

    impl Component for Null {
        fn render(&self, _scope: &mut Scope<'_>) -> VNode {
            VElement::new("div").into()
        }
    }

    fn null_ctor(_props: &Props) -> Box<dyn Component> {
        Box::new(Null)
    }

    fn noop(_ctx: &mut crate::component::HandlerCtx<'_>) {}

    const NULL_DEF: ComponentDef = ComponentDef {
        name: "Null",
        ctor: null_ctor,
        handlers: &[("noop", noop)],
    };

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ComponentRegistry::new();
        registry.register(NULL_DEF).unwrap();

        assert!(registry.contains("Null"));
        let def = registry.resolve("Null").unwrap();
        assert!(def.handler("noop").is_some());
        assert!(def.handler("missing").is_none());
        assert!(registry.resolve("Other").is_none());
    }

    #[test]
    fn test_duplicate_registration_is_an_error() {
        let mut registry = ComponentRegistry::new();
        registry.register(NULL_DEF).unwrap();
        assert!(matches!(
            registry.register(NULL_DEF),
            Err(RuntimeError::DuplicateComponent(name)) if name == "Null"
        ));
    }

    #[test]
    fn test_shared_registry() {
        let shared = SharedRegistry::new();
        shared.register(NULL_DEF).unwrap();

        let shared2 = shared.clone();
        assert!(shared2.get("Null").is_some());
        assert_eq!(shared.with_read(|r| r.len()), 1);
    }
}
