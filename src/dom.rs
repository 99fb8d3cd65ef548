//! In-memory DOM.
//!
//! The live output structure that edit scripts are applied against.
//! Nodes are reference-counted with interior mutability, matching the
//! single-threaded browser main-thread model: handles can be held by the
//! runtime, by component instances and by tests at the same time, and a
//! patch mutates the node in place without invalidating them.
//!
//! Event wiring is declarative: an element stores `(event, method)`
//! bindings plus the id of the owning component instance, and dispatch
//! resolves the method name through the component's typed handler table.
//! No closures are stored in the DOM.

use std::cell::RefCell;
use std::rc::Rc;

use compact_str::CompactString;

use crate::component::InstanceId;

/// Shared handle to a DOM node.
pub type DomHandle = Rc<RefCell<DomNode>>;

/// Rendered attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomAttr {
    /// Bare boolean attribute (`disabled`)
    Bare,
    /// Attribute with a textual value
    Text(String),
}

/// Declarative event binding on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    /// DOM event name (`click`)
    pub event: CompactString,
    /// Handler method name resolved through the instance's handler table
    pub method: CompactString,
}

// =============================================================================
// DomNode / DomElement
// =============================================================================

/// Node in the live DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(DomElement),
    Text(CompactString),
}

/// Element node: tag, attributes, bindings and children.
#[derive(Debug, Clone, Default)]
pub struct DomElement {
    /// Tag name
    pub tag: CompactString,
    /// Attributes in declaration order
    pub attrs: Vec<(CompactString, DomAttr)>,
    /// Live event bindings
    pub bindings: Vec<EventBinding>,
    /// Child handles
    pub children: Vec<DomHandle>,
    /// Owning component instance, if any element in the subtree dispatches to one
    pub instance: Option<InstanceId>,
}

impl DomElement {
    /// Create an element with a tag and nothing else.
    pub fn new(tag: impl Into<CompactString>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Get attribute value by name.
    pub fn get_attr(&self, name: &str) -> Option<&DomAttr> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Get attribute text by name (`None` for bare attributes).
    pub fn attr_text(&self, name: &str) -> Option<&str> {
        match self.get_attr(name)? {
            DomAttr::Text(s) => Some(s),
            DomAttr::Bare => None,
        }
    }

    /// Check if attribute exists.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }

    /// Set attribute value (update if exists, add if not).
    pub fn set_attr(&mut self, name: impl Into<CompactString>, value: DomAttr) {
        let name = name.into();
        if let Some(attr) = self.attrs.iter_mut().find(|(k, _)| *k == name) {
            attr.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    /// Remove attribute by name, returning the old value if it existed.
    pub fn remove_attr(&mut self, name: &str) -> Option<DomAttr> {
        self.attrs
            .iter()
            .position(|(k, _)| k == name)
            .map(|pos| self.attrs.remove(pos).1)
    }

    /// Install an event binding (replacing any binding for the same event).
    pub fn bind(&mut self, event: impl Into<CompactString>, method: impl Into<CompactString>) {
        let event = event.into();
        let method = method.into();
        if let Some(b) = self.bindings.iter_mut().find(|b| b.event == event) {
            b.method = method;
        } else {
            self.bindings.push(EventBinding { event, method });
        }
    }

    /// Look up the handler method bound to an event.
    pub fn binding_for(&self, event: &str) -> Option<&CompactString> {
        self.bindings
            .iter()
            .find(|b| b.event == event)
            .map(|b| &b.method)
    }
}

impl DomNode {
    /// Create an element handle.
    pub fn element(tag: impl Into<CompactString>) -> DomHandle {
        Rc::new(RefCell::new(DomNode::Element(DomElement::new(tag))))
    }

    /// Create a text handle.
    pub fn text(content: impl Into<CompactString>) -> DomHandle {
        Rc::new(RefCell::new(DomNode::Text(content.into())))
    }

    /// Check if this is an element node.
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self, DomNode::Element(_))
    }

    /// Get as element reference.
    #[inline]
    pub fn as_element(&self) -> Option<&DomElement> {
        match self {
            DomNode::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get as mutable element reference.
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut DomElement> {
        match self {
            DomNode::Element(e) => Some(e),
            _ => None,
        }
    }
}

// =============================================================================
// Handle operations
// =============================================================================

/// Get the child at an index, if the handle is an element and the index exists.
pub fn child_at(parent: &DomHandle, index: usize) -> Option<DomHandle> {
    parent
        .borrow()
        .as_element()
        .and_then(|e| e.children.get(index).cloned())
}

/// Number of children of an element handle (0 for text).
pub fn child_count(parent: &DomHandle) -> usize {
    parent.borrow().as_element().map_or(0, |e| e.children.len())
}

/// Insert a child at an index (clamped to the current length).
pub fn insert_child(parent: &DomHandle, index: usize, child: DomHandle) {
    if let Some(elem) = parent.borrow_mut().as_element_mut() {
        let index = index.min(elem.children.len());
        elem.children.insert(index, child);
    }
}

/// Detach and return the child at an index.
pub fn remove_child(parent: &DomHandle, index: usize) -> Option<DomHandle> {
    let mut node = parent.borrow_mut();
    let elem = node.as_element_mut()?;
    if index < elem.children.len() {
        Some(elem.children.remove(index))
    } else {
        None
    }
}

/// Visit every element handle in a subtree, depth-first, root included.
///
/// The visitor returns `false` to skip the element's descendants. No
/// borrow is held across the call, so the visitor may mutate the node;
/// the child list is snapshotted before the visit.
pub fn visit_elements(root: &DomHandle, visit: &mut dyn FnMut(&DomHandle) -> bool) {
    let children = {
        let node = root.borrow();
        let Some(elem) = node.as_element() else { return };
        elem.children.clone()
    };
    if !visit(root) {
        return;
    }
    for child in &children {
        visit_elements(child, visit);
    }
}

/// Collect all elements in a subtree carrying a given attribute, in
/// document order.
pub fn find_with_attr(root: &DomHandle, attr: &str) -> Vec<DomHandle> {
    let mut found = Vec::new();
    visit_elements(root, &mut |handle| {
        if handle.borrow().as_element().is_some_and(|e| e.has_attr(attr)) {
            found.push(handle.clone());
        }
        true
    });
    found
}

// =============================================================================
// HTML snapshot
// =============================================================================

/// Tags that never receive a children pass.
pub(crate) fn is_void_tag(tag: &str) -> bool {
    matches!(tag, "img" | "input" | "br" | "hr" | "meta" | "link")
}

/// Serialize a subtree to HTML.
///
/// This is the same serialization the server render pass emits, so a
/// DOM built by the server pass snapshots byte-identically to its markup.
pub fn outer_html(handle: &DomHandle) -> String {
    let mut out = String::new();
    write_node(handle, &[], &mut out);
    out
}

/// Serialize a subtree to HTML, omitting the named attributes.
///
/// Used to compare hydrated DOM against server markup while ignoring
/// marker attributes.
pub fn outer_html_without(handle: &DomHandle, skip_attrs: &[&str]) -> String {
    let mut out = String::new();
    write_node(handle, skip_attrs, &mut out);
    out
}

fn write_node(handle: &DomHandle, skip: &[&str], out: &mut String) {
    let node = handle.borrow();
    match &*node {
        DomNode::Text(content) => out.push_str(&escape_html(content)),
        DomNode::Element(elem) => {
            out.push('<');
            out.push_str(&elem.tag);
            for (name, value) in &elem.attrs {
                if skip.iter().any(|s| s == name) {
                    continue;
                }
                out.push(' ');
                out.push_str(name);
                if let DomAttr::Text(text) = value {
                    out.push_str("=\"");
                    out.push_str(&escape_attr(text));
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_tag(&elem.tag) {
                return;
            }
            for child in &elem.children {
                write_node(child, skip, out);
            }
            out.push_str("</");
            out.push_str(&elem.tag);
            out.push('>');
        }
    }
}

/// Escape HTML text content.
pub(crate) fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape an attribute value.
pub(crate) fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_operations() {
        let mut elem = DomElement::new("div");
        elem.set_attr("class", DomAttr::Text("hero".into()));
        elem.set_attr("hidden", DomAttr::Bare);

        assert_eq!(elem.attr_text("class"), Some("hero"));
        assert!(elem.has_attr("hidden"));
        assert_eq!(elem.attr_text("hidden"), None);

        elem.set_attr("class", DomAttr::Text("other".into()));
        assert_eq!(elem.attr_text("class"), Some("other"));
        assert_eq!(elem.attrs.len(), 2);

        assert!(elem.remove_attr("hidden").is_some());
        assert!(!elem.has_attr("hidden"));
    }

    #[test]
    fn test_bindings() {
        let mut elem = DomElement::new("button");
        elem.bind("click", "increment");
        elem.bind("click", "decrement"); // rebinding replaces
        assert_eq!(elem.binding_for("click").map(|m| m.as_str()), Some("decrement"));
        assert_eq!(elem.bindings.len(), 1);
    }

    #[test]
    fn test_child_splicing() {
        let parent = DomNode::element("ul");
        insert_child(&parent, 0, DomNode::text("a"));
        insert_child(&parent, 1, DomNode::text("c"));
        insert_child(&parent, 1, DomNode::text("b"));
        assert_eq!(child_count(&parent), 3);

        let removed = remove_child(&parent, 1).unwrap();
        assert!(matches!(&*removed.borrow(), DomNode::Text(t) if t == "b"));
        assert_eq!(child_count(&parent), 2);
        assert!(remove_child(&parent, 9).is_none());
    }

    #[test]
    fn test_outer_html() {
        let root = DomNode::element("div");
        {
            let mut node = root.borrow_mut();
            let elem = node.as_element_mut().unwrap();
            elem.set_attr("class", DomAttr::Text("a & b".into()));
            elem.set_attr("hidden", DomAttr::Bare);
        }
        insert_child(&root, 0, DomNode::text("x < y"));

        assert_eq!(
            outer_html(&root),
            "<div class=\"a &amp; b\" hidden>x &lt; y</div>"
        );
    }

    #[test]
    fn test_outer_html_void_tag() {
        let img = DomNode::element("img");
        img.borrow_mut()
            .as_element_mut()
            .unwrap()
            .set_attr("src", DomAttr::Text("/a.png".into()));
        assert_eq!(outer_html(&img), "<img src=\"/a.png\">");
    }

    #[test]
    fn test_outer_html_without() {
        let root = DomNode::element("section");
        root.borrow_mut()
            .as_element_mut()
            .unwrap()
            .set_attr("data-reflow-id", DomAttr::Text("reflow-1".into()));
        assert_eq!(outer_html_without(&root, &["data-reflow-id"]), "<section></section>");
    }

    #[test]
    fn test_find_with_attr_document_order() {
        let root = DomNode::element("div");
        let a = DomNode::element("section");
        a.borrow_mut().as_element_mut().unwrap().set_attr("data-m", DomAttr::Text("1".into()));
        let b = DomNode::element("aside");
        b.borrow_mut().as_element_mut().unwrap().set_attr("data-m", DomAttr::Text("2".into()));
        insert_child(&root, 0, a);
        insert_child(&root, 1, b);

        let found = find_with_attr(&root, "data-m");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].borrow().as_element().unwrap().attr_text("data-m"), Some("1"));
    }
}
