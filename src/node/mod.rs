//! Virtual node types.
//!
//! A `VNode` is an immutable description of one point in a UI tree:
//! text, element, fragment, or a reference to a registered component.
//! Every update produces a new tree; nodes are never mutated after
//! construction. Builders drop absent (`None`) children and splice
//! fragment children into their parent's list at construction time, so
//! the differ never sees placeholder children and a fragment survives
//! only at a tree root.

mod element;
mod component;

pub use element::VElement;
pub use component::VComponent;

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::props::Props;

/// Type alias for children collection.
pub type Children = SmallVec<[VNode; 8]>;

/// Append a node to a child list, splicing fragments inline so they
/// never nest below their parent.
pub(crate) fn push_flat(children: &mut Children, node: VNode) {
    match node {
        VNode::Fragment(frag) => {
            for child in frag.children {
                push_flat(children, child);
            }
        }
        other => children.push(other),
    }
}

/// Discriminant of a virtual node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Element,
    Fragment,
    Component,
}

/// Node in a virtual tree.
#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    /// Plain text content (escaped on render)
    Text(CompactString),
    /// Concrete element with tag, props and children
    Element(Box<VElement>),
    /// Children without a wrapping container
    Fragment(Box<VFragment>),
    /// Reference to a component resolved through the registry
    Component(Box<VComponent>),
}

impl VNode {
    /// Create a text node.
    pub fn text(content: impl Into<CompactString>) -> Self {
        VNode::Text(content.into())
    }

    /// Get the node kind.
    pub fn kind(&self) -> NodeKind {
        match self {
            VNode::Text(_) => NodeKind::Text,
            VNode::Element(_) => NodeKind::Element,
            VNode::Fragment(_) => NodeKind::Fragment,
            VNode::Component(_) => NodeKind::Component,
        }
    }

    /// Check if this is a text node.
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self, VNode::Text(_))
    }

    /// Check if this is an element node.
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self, VNode::Element(_))
    }

    /// Get as element reference.
    #[inline]
    pub fn as_element(&self) -> Option<&VElement> {
        match self {
            VNode::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get as component reference.
    #[inline]
    pub fn as_component(&self) -> Option<&VComponent> {
        match self {
            VNode::Component(c) => Some(c),
            _ => None,
        }
    }

    /// Children of this node, if it carries any.
    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Text(_) => &[],
            VNode::Element(e) => &e.children,
            VNode::Fragment(f) => &f.children,
            VNode::Component(c) => &c.children,
        }
    }

    /// Props of this node, if it carries any.
    pub fn props(&self) -> Option<&Props> {
        match self {
            VNode::Element(e) => Some(&e.props),
            VNode::Component(c) => Some(&c.props),
            _ => None,
        }
    }
}

impl From<VElement> for VNode {
    fn from(elem: VElement) -> Self {
        VNode::Element(Box::new(elem))
    }
}

impl From<VFragment> for VNode {
    fn from(frag: VFragment) -> Self {
        VNode::Fragment(Box::new(frag))
    }
}

impl From<VComponent> for VNode {
    fn from(comp: VComponent) -> Self {
        VNode::Component(Box::new(comp))
    }
}

impl From<&str> for VNode {
    fn from(content: &str) -> Self {
        VNode::text(content)
    }
}

impl From<String> for VNode {
    fn from(content: String) -> Self {
        VNode::text(content)
    }
}

// =============================================================================
// VFragment
// =============================================================================

/// Multiple children without a wrapping container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VFragment {
    /// Child nodes
    pub children: Children,
}

impl VFragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child node.
    pub fn child(mut self, node: impl Into<VNode>) -> Self {
        push_flat(&mut self.children, node.into());
        self
    }

    /// Append a child if present; `None` is dropped here, not at diff time.
    pub fn child_opt(mut self, node: Option<VNode>) -> Self {
        if let Some(node) = node {
            push_flat(&mut self.children, node);
        }
        self
    }

    /// Append multiple children.
    pub fn children<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VNode>,
    {
        for node in nodes {
            push_flat(&mut self.children, node.into());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kinds() {
        let text = VNode::text("hello");
        assert_eq!(text.kind(), NodeKind::Text);
        assert!(text.is_text());

        let elem: VNode = VElement::new("div").into();
        assert_eq!(elem.kind(), NodeKind::Element);
        assert!(elem.as_element().is_some());

        let frag: VNode = VFragment::new().child("a").child("b").into();
        assert_eq!(frag.kind(), NodeKind::Fragment);
        assert_eq!(frag.children().len(), 2);

        let comp: VNode = VComponent::new("Hero").into();
        assert_eq!(comp.kind(), NodeKind::Component);
    }

    #[test]
    fn test_fragment_children_splice_at_construction() {
        let inner = VFragment::new().child("b").child("c");
        let elem = VElement::new("div").child("a").child(inner).child("d");

        // The differ never sees a nested fragment slot.
        assert_eq!(elem.children.len(), 4);
        assert!(elem.children.iter().all(VNode::is_text));
    }

    #[test]
    fn test_absent_children_dropped_at_construction() {
        let frag = VFragment::new()
            .child("a")
            .child_opt(None)
            .child_opt(Some(VNode::text("b")));
        assert_eq!(frag.children.len(), 2);
    }

    #[test]
    fn test_tree_equality_is_deep() {
        let a: VNode = VElement::new("div").attr("class", "hero").text("hi").into();
        let b: VNode = VElement::new("div").attr("class", "hero").text("hi").into();
        assert_eq!(a, b);

        let c: VNode = VElement::new("div").attr("class", "other").text("hi").into();
        assert_ne!(a, c);
    }
}
