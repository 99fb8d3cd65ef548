//! Element node type.
//!
//! The core building block of a virtual tree.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::props::{KEY_PROP, Props, Value};

use super::{Children, VNode, push_flat};

// =============================================================================
// VElement
// =============================================================================

/// Concrete element with tag, props and children.
#[derive(Debug, Clone, PartialEq)]
pub struct VElement {
    /// Tag name (`div`, `section`, ...)
    pub tag: CompactString,
    /// Ordered prop map
    pub props: Props,
    /// Child nodes
    pub children: Children,
}

impl VElement {
    /// Create an element with no props and no children.
    pub fn new(tag: impl Into<CompactString>) -> Self {
        Self {
            tag: tag.into(),
            props: Props::new(),
            children: SmallVec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder API
    // ─────────────────────────────────────────────────────────────────────────

    /// Set a prop.
    pub fn attr(mut self, name: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Declare an event handler by method name (`.on("onClick", "increment")`).
    pub fn on(self, event_prop: impl Into<CompactString>, method: impl Into<Value>) -> Self {
        self.attr(event_prop, method)
    }

    /// Set the reserved `key` prop.
    pub fn key(self, key: impl Into<Value>) -> Self {
        self.attr(KEY_PROP, key)
    }

    /// Append a child node. Fragment children splice inline.
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

    /// Append a text child.
    pub fn text(mut self, content: impl Into<CompactString>) -> Self {
        self.children.push(VNode::text(content));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a prop value by name.
    pub fn get_prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// Check if element has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_builder() {
        let elem = VElement::new("button")
            .attr("class", "btn")
            .attr("disabled", true)
            .on("onClick", "increment")
            .text("Go");

        assert_eq!(elem.tag, "button");
        assert_eq!(elem.get_prop("class"), Some(&Value::from("btn")));
        assert_eq!(elem.get_prop("disabled"), Some(&Value::Bool(true)));
        assert_eq!(elem.child_count(), 1);
    }

    #[test]
    fn test_conditional_children() {
        let show_extra = false;
        let elem = VElement::new("ul")
            .child(VElement::new("li").text("a"))
            .child_opt(show_extra.then(|| VElement::new("li").text("b").into()));
        assert_eq!(elem.child_count(), 1);
    }
}
