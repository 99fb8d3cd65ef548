//! Component reference node type.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::props::{Props, Value};

use super::{Children, VNode, push_flat};

/// Reference to a registered component at a tree position.
///
/// The name is resolved through the component registry at render time;
/// an unresolved name renders as empty content (see the render module).
#[derive(Debug, Clone, PartialEq)]
pub struct VComponent {
    /// Registered component name
    pub name: CompactString,
    /// Props passed to the instance (replaced wholesale on parent re-render)
    pub props: Props,
    /// Children forwarded to the component
    pub children: Children,
}

impl VComponent {
    /// Create a component reference with no props.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            props: Props::new(),
            children: SmallVec::new(),
        }
    }

    /// Set a prop.
    pub fn prop(mut self, name: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Replace the whole prop map.
    pub fn props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Append a forwarded child. Fragment children splice inline.
    pub fn child(mut self, node: impl Into<VNode>) -> Self {
        push_flat(&mut self.children, node.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_ref() {
        let comp = VComponent::new("Hero").prop("title", "Welcome");
        assert_eq!(comp.name, "Hero");
        assert_eq!(comp.props.get("title"), Some(&Value::from("Welcome")));
    }
}
