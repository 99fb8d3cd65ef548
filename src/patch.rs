//! Edit script application.
//!
//! Applies a diff script to a live DOM subtree. Realizing virtual nodes
//! into DOM (and unmounting whatever a removed subtree contained) is the
//! host's business, behind `PatchHost`; the runtime is the real host,
//! `StaticHost` covers component-free trees and tests. Edits landing on
//! the root of a nested live instance are handed back to the host, which
//! applies them through that instance's lifecycle rather than as raw
//! attribute writes.
//!
//! Within one `UpdateChildren` the per-index edits are applied in three
//! passes: in-place updates first, then insertions in ascending index
//! order, then removals in descending index order. The differ emits
//! insertions and removals only past the shorter child list's length, so
//! no pass shifts an index another pass still needs.

use crate::diff::{ChildEdit, EditOp, EditScript};
use crate::dom::{DomHandle, DomNode, child_at, insert_child, remove_child};
use crate::error::{RuntimeError, RuntimeResult};
use crate::node::VNode;
use crate::props::Props;
use crate::render::{AttrTarget, apply_attrs};

/// Environment an edit script is applied in.
pub trait PatchHost {
    /// Render a virtual node into a fresh DOM subtree.
    fn realize(&mut self, node: &VNode) -> RuntimeResult<DomHandle>;

    /// A subtree has left the DOM; tear down anything living in it.
    fn retire(&mut self, handle: &DomHandle);

    /// A freshly realized root was copied into an existing cell; hosts
    /// tracking handles by identity re-point them here.
    fn relocated(&mut self, _from: &DomHandle, _to: &DomHandle) {}

    /// Edits addressed to the root of a nested live instance. The host
    /// applies them through that instance's own lifecycle (prop
    /// replacement and re-render) instead of raw DOM mutation. Returns
    /// `false` when the target is not such a root.
    fn forward_slot(&mut self, _target: &DomHandle, _script: &EditScript) -> RuntimeResult<bool> {
        Ok(false)
    }
}

/// Apply an edit script to the subtree rooted at `target`.
pub fn apply(
    host: &mut dyn PatchHost,
    target: &DomHandle,
    script: &EditScript,
) -> RuntimeResult<()> {
    if script.is_empty() {
        return Ok(());
    }
    // A slot occupied by another live instance updates through that
    // instance's render cycle; only a whole-subtree replace touches its
    // DOM directly.
    if !script.iter().any(|op| matches!(op, EditOp::Replace(_)))
        && host.forward_slot(target, script)?
    {
        return Ok(());
    }
    for op in script {
        match op {
            EditOp::Replace(node) => replace_in_place(host, target, node)?,
            EditOp::UpdateProps(props) => update_props(target, props)?,
            EditOp::UpdateChildren(edits) => update_children(host, target, edits)?,
            // Top-level existence changes are mount/unmount, not patches.
            EditOp::Insert(_, _) | EditOp::Remove(_) => {
                return Err(RuntimeError::patch_mismatch(
                    "insert/remove op outside a child list",
                ));
            }
        }
    }
    Ok(())
}

/// Replace the contents of `target` while keeping the cell (and every
/// handle pointing at it) alive.
fn replace_in_place(
    host: &mut dyn PatchHost,
    target: &DomHandle,
    node: &VNode,
) -> RuntimeResult<()> {
    let fresh = host.realize(node)?;
    host.retire(target);
    let replacement = fresh.borrow().clone();
    *target.borrow_mut() = replacement;
    host.relocated(&fresh, target);
    Ok(())
}

fn update_props(target: &DomHandle, props: &Props) -> RuntimeResult<()> {
    let mut node = target.borrow_mut();
    let Some(elem) = node.as_element_mut() else {
        return Err(RuntimeError::patch_mismatch("prop update on a text node"));
    };
    apply_attrs(elem, props, &AttrTarget::Client);
    Ok(())
}

fn update_children(
    host: &mut dyn PatchHost,
    target: &DomHandle,
    edits: &[ChildEdit],
) -> RuntimeResult<()> {
    if !target.borrow().is_element() {
        return Err(RuntimeError::patch_mismatch("child edits on a text node"));
    }

    // Pass 1: in-place edits of existing slots.
    for edit in edits {
        if matches!(edit.ops.as_slice(), [EditOp::Insert(_, _)] | [EditOp::Remove(_)]) {
            continue;
        }
        let Some(child) = child_at(target, edit.index) else {
            return Err(RuntimeError::patch_mismatch(format!(
                "no child at index {}",
                edit.index
            )));
        };
        apply(host, &child, &edit.ops)?;
    }

    // Pass 2: insertions, ascending.
    for edit in edits {
        if let [EditOp::Insert(node, index)] = edit.ops.as_slice() {
            let fresh = host.realize(node)?;
            insert_child(target, *index, fresh);
        }
    }

    // Pass 3: removals, descending.
    for edit in edits.iter().rev() {
        if let [EditOp::Remove(index)] = edit.ops.as_slice() {
            let Some(removed) = remove_child(target, *index) else {
                return Err(RuntimeError::patch_mismatch(format!(
                    "no child to remove at index {index}"
                )));
            };
            host.retire(&removed);
        }
    }

    Ok(())
}

// =============================================================================
// StaticHost
// =============================================================================

/// Host for component-free trees: realizes elements, text and fragments,
/// renders component references as empty text with a warning.
#[derive(Debug, Default)]
pub struct StaticHost;

impl PatchHost for StaticHost {
    fn realize(&mut self, node: &VNode) -> RuntimeResult<DomHandle> {
        realize_static(node)
    }

    fn retire(&mut self, _handle: &DomHandle) {}
}

/// Realize a node without component resolution. Fragments get a `div`
/// container so the result is always one handle.
pub(crate) fn realize_static(node: &VNode) -> RuntimeResult<DomHandle> {
    match node {
        VNode::Text(content) => Ok(DomNode::text(content.clone())),
        VNode::Element(elem) => {
            let handle = DomNode::element(elem.tag.clone());
            {
                let mut dom = handle.borrow_mut();
                if let Some(target) = dom.as_element_mut() {
                    apply_attrs(target, &elem.props, &AttrTarget::Client);
                }
            }
            let mut children = Vec::with_capacity(elem.children.len());
            for child in &elem.children {
                children.push(realize_static(child)?);
            }
            if let Some(target) = handle.borrow_mut().as_element_mut() {
                target.children = children;
            }
            Ok(handle)
        }
        VNode::Fragment(frag) => {
            let wrapper = DomNode::element("div");
            let mut children = Vec::with_capacity(frag.children.len());
            for child in &frag.children {
                children.push(realize_static(child)?);
            }
            if let Some(target) = wrapper.borrow_mut().as_element_mut() {
                target.children = children;
            }
            Ok(wrapper)
        }
        VNode::Component(comp) => {
            tracing::warn!(component = %comp.name, "component reference in a static tree");
            Ok(DomNode::text(""))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use crate::dom::{child_count, outer_html};
    use crate::node::{VElement, VNode};

    fn patch_pair(old: VNode, new: VNode) -> DomHandle {
        let root = realize_static(&old).unwrap();
        let script = diff(Some(&old), Some(&new)).unwrap();
        apply(&mut StaticHost, &root, &script).unwrap();
        root
    }

    #[test]
    fn test_patched_dom_matches_direct_render() {
        let old: VNode = VElement::new("div")
            .attr("class", "a")
            .child(VElement::new("p").text("one"))
            .child(VElement::new("p").text("two"))
            .into();
        let new: VNode = VElement::new("div")
            .attr("class", "b")
            .child(VElement::new("p").text("one"))
            .child(VElement::new("em").text("2"))
            .child(VElement::new("p").text("three"))
            .into();

        let patched = patch_pair(old, new.clone());
        let direct = realize_static(&new).unwrap();
        assert_eq!(outer_html(&patched), outer_html(&direct));
    }

    #[test]
    fn test_prop_update_drops_stale_attributes() {
        let old: VNode = VElement::new("div").attr("a", "1").attr("b", "2").into();
        let new: VNode = VElement::new("div").attr("b", "2").into();

        let patched = patch_pair(old, new);
        let node = patched.borrow();
        let elem = node.as_element().unwrap();
        assert!(!elem.has_attr("a"));
        assert_eq!(elem.attr_text("b"), Some("2"));
    }

    #[test]
    fn test_replace_keeps_the_cell_alive() {
        let old: VNode = VElement::new("div").child(VElement::new("p").text("x")).into();
        let new: VNode = VElement::new("div").child(VElement::new("h1").text("y")).into();

        let root = realize_static(&old).unwrap();
        // Handle grabbed before the patch must observe the replacement.
        let child = child_at(&root, 0).unwrap();

        let script = diff(Some(&old), Some(&new)).unwrap();
        apply(&mut StaticHost, &root, &script).unwrap();

        assert_eq!(outer_html(&child), "<h1>y</h1>");
    }

    #[test]
    fn test_child_removal() {
        let old: VNode = VElement::new("ul").text("a").text("b").text("c").into();
        let new: VNode = VElement::new("ul").text("a").text("b").into();

        let patched = patch_pair(old, new);
        assert_eq!(child_count(&patched), 2);
        assert_eq!(outer_html(&patched), "<ul>ab</ul>");
    }

    #[test]
    fn test_mismatched_script_is_an_error() {
        let root = DomNode::text("plain");
        let script = vec![EditOp::UpdateProps(Props::new())];
        assert!(matches!(
            apply(&mut StaticHost, &root, &script),
            Err(RuntimeError::PatchMismatch(_))
        ));
    }
}
