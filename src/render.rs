//! Server render pass.
//!
//! Walks a virtual tree into an in-memory DOM and, for every component
//! reference, records a hydration entry in a JSON side channel. The
//! in-memory DOM is the same structure the client patches, so the
//! server's markup and a freshly parsed copy of it are one and the same
//! tree; `ServerOutput::html` is just its serialization.
//!
//! Component roots are stamped with marker attributes (`data-reflow-id`,
//! `data-reflow-component`). A component whose render result is not a
//! single element is wrapped in a `div` so the marker always sits on one
//! element. Event-handler props never render as live bindings here; they
//! become `data-on-*` attributes for the hydrator to rewire.

use compact_str::{CompactString, format_compact};

use crate::component::Scope;
use crate::dom::{DomAttr, DomElement, DomHandle, DomNode, outer_html};
use crate::error::{RuntimeError, RuntimeResult};
use crate::hooks::HookStore;
use crate::hydrate::{HydrationPayload, HydrationRecord};
use crate::node::VNode;
use crate::props::{KEY_PROP, Props, attr_text, event_name, AttrText};
use crate::registry::SharedRegistry;

/// Maximum element nesting depth for a render pass.
pub const MAX_RENDER_DEPTH: usize = 64;

// =============================================================================
// RenderConfig
// =============================================================================

/// Attribute and id conventions shared by the server pass and the hydrator.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Marker attribute carrying the hydration record key
    pub marker_attr: CompactString,
    /// Marker attribute carrying the component name
    pub component_attr: CompactString,
    /// Attribute listing an element's forwarded events (`click,submit`)
    pub events_attr: CompactString,
    /// Prefix of serialized event-binding attributes (`data-on-click`)
    pub event_attr_prefix: CompactString,
    /// Prefix of generated marker ids
    pub marker_prefix: CompactString,
    /// Element id of the JSON payload script block
    pub payload_script_id: CompactString,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            marker_attr: "data-reflow-id".into(),
            component_attr: "data-reflow-component".into(),
            events_attr: "data-reflow-events".into(),
            event_attr_prefix: "data-on-".into(),
            marker_prefix: "reflow-".into(),
            payload_script_id: "reflow-hydration-data".into(),
        }
    }
}

// =============================================================================
// Attribute application
// =============================================================================

/// Where rendered props land: serialized markup or the live client DOM.
pub(crate) enum AttrTarget<'a> {
    /// Event props become `data-on-*` attributes
    Server(&'a RenderConfig),
    /// Event props become live bindings
    Client,
}

/// Apply a full prop set to an element, replacing whatever attributes and
/// bindings it carried. The `key` prop is identity metadata and never lands.
pub(crate) fn apply_attrs(elem: &mut DomElement, props: &Props, target: &AttrTarget<'_>) {
    elem.attrs.clear();
    elem.bindings.clear();
    let mut events: Vec<CompactString> = Vec::new();
    for (name, value) in props {
        if name == KEY_PROP {
            continue;
        }
        if let Some(event) = event_name(name) {
            let Some(method) = value.as_str() else {
                tracing::warn!(prop = %name, "event prop value is not a method name string");
                continue;
            };
            match target {
                AttrTarget::Server(config) => {
                    let attr = format_compact!("{}{event}", config.event_attr_prefix);
                    elem.set_attr(attr, DomAttr::Text(method.to_string()));
                    events.push(event);
                }
                AttrTarget::Client => elem.bind(event, method),
            }
            continue;
        }
        match attr_text(value) {
            None => {}
            Some(AttrText::Bare) => elem.set_attr(name.clone(), DomAttr::Bare),
            Some(AttrText::Text(text)) => elem.set_attr(name.clone(), DomAttr::Text(text)),
        }
    }
    // Forwarded-event list, in declaration order.
    if let AttrTarget::Server(config) = target
        && !events.is_empty()
    {
        elem.set_attr(config.events_attr.clone(), DomAttr::Text(events.join(",")));
    }
}

// =============================================================================
// ServerOutput
// =============================================================================

/// Result of a server render pass.
#[derive(Debug)]
pub struct ServerOutput {
    /// Rendered top-level nodes (a fragment root yields several)
    pub roots: Vec<DomHandle>,
    /// Hydration records keyed by marker id, in render order
    pub payload: HydrationPayload,
}

impl ServerOutput {
    /// Serialize the rendered nodes to markup, without the payload.
    pub fn html(&self) -> String {
        let mut out = String::new();
        for root in &self.roots {
            out.push_str(&outer_html(root));
        }
        out
    }

    /// Serialize markup plus the payload script block (omitted when no
    /// component was rendered).
    pub fn html_with_payload(&self, config: &RenderConfig) -> String {
        let mut out = self.html();
        if !self.payload.is_empty() {
            out.push_str(&self.payload.script_block(config));
        }
        out
    }
}

// =============================================================================
// ServerRenderer
// =============================================================================

/// Renders virtual trees to markup and hydration records.
#[derive(Debug)]
pub struct ServerRenderer {
    config: RenderConfig,
    registry: SharedRegistry,
    next_marker: u64,
}

impl ServerRenderer {
    /// Create a renderer resolving components through the given registry.
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            config: RenderConfig::default(),
            registry,
            next_marker: 0,
        }
    }

    /// Override the marker conventions.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// The active marker conventions.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a tree to an in-memory DOM plus hydration records.
    ///
    /// Marker ids keep incrementing across calls, so several renders into
    /// the same page never collide.
    pub fn render(&mut self, node: &VNode) -> RuntimeResult<ServerOutput> {
        let mut payload = HydrationPayload::new();
        let mut roots = Vec::new();
        self.render_node(node, 0, &mut payload, &mut roots)?;
        Ok(ServerOutput { roots, payload })
    }

    /// Render a tree straight to markup with the payload block appended.
    pub fn render_to_string(&mut self, node: &VNode) -> RuntimeResult<String> {
        let output = self.render(node)?;
        Ok(output.html_with_payload(&self.config))
    }

    fn render_node(
        &mut self,
        node: &VNode,
        depth: usize,
        payload: &mut HydrationPayload,
        out: &mut Vec<DomHandle>,
    ) -> RuntimeResult<()> {
        if depth > MAX_RENDER_DEPTH {
            return Err(RuntimeError::DepthExceeded { max: MAX_RENDER_DEPTH });
        }

        match node {
            VNode::Text(content) => {
                out.push(DomNode::text(content.clone()));
            }
            VNode::Element(elem) => {
                let handle = DomNode::element(elem.tag.clone());
                {
                    let mut dom = handle.borrow_mut();
                    let target = dom.as_element_mut();
                    if let Some(target) = target {
                        apply_attrs(target, &elem.props, &AttrTarget::Server(&self.config));
                    }
                }
                let mut children = Vec::new();
                for child in &elem.children {
                    self.render_node(child, depth + 1, payload, &mut children)?;
                }
                if let Some(target) = handle.borrow_mut().as_element_mut() {
                    target.children = children;
                }
                out.push(handle);
            }
            VNode::Fragment(frag) => {
                // No wrapping container; construction-time flattening
                // means a fragment only ever appears at a tree root.
                for child in &frag.children {
                    self.render_node(child, depth, payload, out)?;
                }
            }
            VNode::Component(comp) => {
                self.render_component(comp.name.as_str(), &comp.props, depth, payload, out)?;
            }
        }
        Ok(())
    }

    fn render_component(
        &mut self,
        name: &str,
        props: &Props,
        depth: usize,
        payload: &mut HydrationPayload,
        out: &mut Vec<DomHandle>,
    ) -> RuntimeResult<()> {
        let Some(def) = self.registry.get(name) else {
            // Permissive: an unknown name renders as empty content. The
            // empty text node keeps the child slot occupied, matching the
            // client realizer, so positional patching stays aligned.
            tracing::warn!(component = name, "unresolved component reference, rendering nothing");
            out.push(DomNode::text(""));
            return Ok(());
        };

        // The parent's marker id precedes its children's.
        self.next_marker += 1;
        let marker = format_compact!("{}{}", self.config.marker_prefix, self.next_marker);

        let behavior = (def.ctor)(props);
        let state = behavior.initial_state(props);
        // Effects never execute during the server pass.
        let mut hooks = HookStore::inert();
        hooks.begin_render();
        let tree = {
            let mut scope = Scope::new(props, &state, &mut hooks);
            behavior.render(&mut scope)
        };
        hooks.end_render();

        let mut subtree = Vec::new();
        self.render_node(&tree, depth + 1, payload, &mut subtree)?;
        let root = mount_point(subtree);
        if let Some(elem) = root.borrow_mut().as_element_mut() {
            elem.set_attr(self.config.marker_attr.clone(), DomAttr::Text(marker.to_string()));
            elem.set_attr(self.config.component_attr.clone(), DomAttr::Text(name.to_string()));
        }

        payload.insert(
            marker,
            HydrationRecord {
                component: CompactString::from(name),
                props: props.clone(),
                state,
            },
        );
        out.push(root);
        Ok(())
    }
}

/// Normalize a component's rendered nodes to a single markable element.
fn mount_point(mut subtree: Vec<DomHandle>) -> DomHandle {
    if subtree.len() == 1 && subtree[0].borrow().is_element() {
        return subtree.remove(0);
    }
    let wrapper = DomNode::element("div");
    if let Some(elem) = wrapper.borrow_mut().as_element_mut() {
        elem.children = subtree;
    }
    wrapper
}

/// Render a component-free tree to markup.
pub fn render_static(node: &VNode) -> RuntimeResult<String> {
    let mut renderer = ServerRenderer::new(SharedRegistry::new());
    let output = renderer.render(node)?;
    Ok(output.html())
}
