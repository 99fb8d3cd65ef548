//! Tree diff algorithm.
//!
//! Computes an edit script between two virtual trees. This is a pure
//! algorithm module: the script is plain data, produced here, inspectable
//! in tests, and applied separately by the patch module.
//!
//! # Algorithm
//!
//! 1. Value-equal trees short-circuit to an empty script
//! 2. A kind/tag/name mismatch replaces the whole subtree
//! 3. Same-shaped nodes compare props by deep, order-independent equality
//!    and children strictly by position
//!
//! # Positional children
//!
//! Children are matched index-by-index up to `max(old_len, new_len)`,
//! with missing indices treated as absent. There is no move detection:
//! reordering a list causes a replace of every shifted slot. Callers that
//! reorder keyed lists pay full subtree replacement per slot; this is an
//! intentional property of the algorithm, not an oversight.

use crate::error::{RuntimeError, RuntimeResult};
use crate::node::{NodeKind, VNode};
use crate::props::Props;

/// Maximum depth for recursive diffing.
pub const MAX_DIFF_DEPTH: usize = 64;

// =============================================================================
// Edit script
// =============================================================================

/// Ordered list of operations transforming one tree into another.
pub type EditScript = Vec<EditOp>;

/// Single edit operation.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    /// Discard the target subtree and render this node in its place
    Replace(VNode),
    /// Swap in the full new prop set (stale props must be removed by the applier)
    UpdateProps(Props),
    /// Per-index edits of the target's children
    UpdateChildren(Vec<ChildEdit>),
    /// Render the node and splice it in at the index
    Insert(VNode, usize),
    /// Detach the child at the index
    Remove(usize),
}

/// Edit script scoped to one child index.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildEdit {
    /// Position in the (new) child list
    pub index: usize,
    /// Operations for that position
    pub ops: EditScript,
}

/// Statistics from a diff operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffStats {
    /// Number of node pairs compared
    pub nodes_compared: usize,
    /// Number of subtree replacements
    pub replaces: usize,
    /// Number of prop set updates
    pub prop_updates: usize,
    /// Number of insertions
    pub inserts: usize,
    /// Number of removals
    pub removes: usize,
}

// =============================================================================
// Public API
// =============================================================================

/// Diff two trees into an edit script.
///
/// `None` on either side means the node is absent at this position:
/// absent-to-present yields `Insert`, present-to-absent yields `Remove`.
/// Value-equal trees yield an empty script.
pub fn diff(old: Option<&VNode>, new: Option<&VNode>) -> RuntimeResult<EditScript> {
    diff_with_stats(old, new).map(|(script, _)| script)
}

/// Diff two trees, also returning statistics about the comparison.
pub fn diff_with_stats(
    old: Option<&VNode>,
    new: Option<&VNode>,
) -> RuntimeResult<(EditScript, DiffStats)> {
    let mut ctx = DiffContext::default();
    let script = ctx.diff_nodes(old, new, 0, 0)?;
    Ok((script, ctx.stats))
}

// =============================================================================
// Internal context
// =============================================================================

#[derive(Default)]
struct DiffContext {
    stats: DiffStats,
}

impl DiffContext {
    /// Diff a node pair at a given child index and depth.
    fn diff_nodes(
        &mut self,
        old: Option<&VNode>,
        new: Option<&VNode>,
        index: usize,
        depth: usize,
    ) -> RuntimeResult<EditScript> {
        if depth > MAX_DIFF_DEPTH {
            return Err(RuntimeError::DepthExceeded { max: MAX_DIFF_DEPTH });
        }

        let (old, new) = match (old, new) {
            (None, None) => return Ok(Vec::new()),
            (None, Some(new)) => {
                self.stats.inserts += 1;
                return Ok(vec![EditOp::Insert(new.clone(), index)]);
            }
            (Some(_), None) => {
                self.stats.removes += 1;
                return Ok(vec![EditOp::Remove(index)]);
            }
            (Some(old), Some(new)) => (old, new),
        };

        self.stats.nodes_compared += 1;

        // Deep value equality short-circuits to the empty script.
        if old == new {
            return Ok(Vec::new());
        }

        // Type boundary: no partial reuse across kinds, tags or names.
        if !same_shape(old, new) {
            self.stats.replaces += 1;
            return Ok(vec![EditOp::Replace(new.clone())]);
        }

        match (old, new) {
            // Same kind but different content (we already know old != new)
            (VNode::Text(_), VNode::Text(_)) => {
                self.stats.replaces += 1;
                Ok(vec![EditOp::Replace(new.clone())])
            }
            _ => {
                let mut ops = EditScript::new();

                // Props: order-independent deep equality; a difference at any
                // key yields one op carrying the full new prop set.
                if let (Some(old_props), Some(new_props)) = (old.props(), new.props())
                    && old_props != new_props
                {
                    self.stats.prop_updates += 1;
                    ops.push(EditOp::UpdateProps(new_props.clone()));
                }

                let child_edits = self.diff_children(old.children(), new.children(), depth)?;
                if !child_edits.is_empty() {
                    ops.push(EditOp::UpdateChildren(child_edits));
                }

                Ok(ops)
            }
        }
    }

    /// Diff two child lists positionally, index-by-index up to the longer
    /// list's length.
    fn diff_children(
        &mut self,
        old_children: &[VNode],
        new_children: &[VNode],
        depth: usize,
    ) -> RuntimeResult<Vec<ChildEdit>> {
        let len = old_children.len().max(new_children.len());
        let mut edits = Vec::new();

        for index in 0..len {
            let ops = self.diff_nodes(
                old_children.get(index),
                new_children.get(index),
                index,
                depth + 1,
            )?;
            if !ops.is_empty() {
                edits.push(ChildEdit { index, ops });
            }
        }

        Ok(edits)
    }
}

/// Check whether two nodes occupy the same type slot: same kind, same tag
/// for elements, same component name for component refs.
fn same_shape(old: &VNode, new: &VNode) -> bool {
    if old.kind() != new.kind() {
        return false;
    }
    match (old, new) {
        (VNode::Element(a), VNode::Element(b)) => a.tag == b.tag,
        (VNode::Component(a), VNode::Component(b)) => a.name == b.name,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{VComponent, VElement};
    use crate::props::props;

    fn div() -> VElement {
        VElement::new("div")
    }

    #[test]
    fn test_diff_idempotent_on_equal_trees() {
        let a: VNode = div()
            .attr("class", "hero")
            .child(VElement::new("h1").text("Welcome"))
            .into();
        // A structurally independent copy, not the same reference.
        let b = a.clone();

        let script = diff(Some(&a), Some(&b)).unwrap();
        assert!(script.is_empty(), "diff(T, T) must be empty, got {script:?}");
    }

    #[test]
    fn test_idempotence_survives_prop_reordering() {
        let a: VNode = div().attr("a", "1").attr("b", "2").into();
        let b: VNode = div().attr("b", "2").attr("a", "1").into();
        assert!(diff(Some(&a), Some(&b)).unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_remove_at_top_level() {
        let node: VNode = div().into();

        let script = diff(None, Some(&node)).unwrap();
        assert_eq!(script, vec![EditOp::Insert(node.clone(), 0)]);

        let script = diff(Some(&node), None).unwrap();
        assert_eq!(script, vec![EditOp::Remove(0)]);

        assert!(diff(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_replace_on_tag_change() {
        // Equal props and children must not prevent the replace.
        let old: VNode = VElement::new("div").attr("class", "x").text("same").into();
        let new: VNode = VElement::new("span").attr("class", "x").text("same").into();

        let script = diff(Some(&old), Some(&new)).unwrap();
        assert_eq!(script.len(), 1);
        assert!(matches!(&script[0], EditOp::Replace(n) if *n == new));
    }

    #[test]
    fn test_replace_on_kind_change() {
        let old: VNode = VNode::text("hello");
        let new: VNode = div().into();
        let script = diff(Some(&old), Some(&new)).unwrap();
        assert!(matches!(&script[0], EditOp::Replace(_)));
    }

    #[test]
    fn test_replace_on_component_name_change() {
        let old: VNode = VComponent::new("Hero").into();
        let new: VNode = VComponent::new("Banner").into();
        let script = diff(Some(&old), Some(&new)).unwrap();
        assert!(matches!(&script[0], EditOp::Replace(_)));
    }

    #[test]
    fn test_prop_change_carries_full_new_set() {
        let old: VNode = div().attr("a", "1").attr("b", "2").into();
        let new: VNode = div().attr("a", "1").into();

        let script = diff(Some(&old), Some(&new)).unwrap();
        assert_eq!(script, vec![EditOp::UpdateProps(props([("a", "1")]))]);
    }

    #[test]
    fn test_text_content_change_is_replace() {
        let old: VNode = VNode::text("Hello");
        let new: VNode = VNode::text("World");
        let script = diff(Some(&old), Some(&new)).unwrap();
        assert_eq!(script, vec![EditOp::Replace(new.clone())]);
    }

    #[test]
    fn test_middle_removal_is_positional_not_a_move() {
        // [A, B, C] -> [A, C]: slot 1 is replaced with C and slot 2 removed.
        // C is NOT recognized as moving from index 2 to index 1.
        let old: VNode = div().text("A").text("B").text("C").into();
        let new: VNode = div().text("A").text("C").into();

        let script = diff(Some(&old), Some(&new)).unwrap();
        assert_eq!(script.len(), 1);
        let EditOp::UpdateChildren(edits) = &script[0] else {
            panic!("expected UpdateChildren, got {script:?}");
        };

        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].index, 1);
        assert_eq!(edits[0].ops, vec![EditOp::Replace(VNode::text("C"))]);
        assert_eq!(edits[1].index, 2);
        assert_eq!(edits[1].ops, vec![EditOp::Remove(2)]);
    }

    #[test]
    fn test_appended_children_yield_inserts() {
        let old: VNode = div().text("a").into();
        let new: VNode = div().text("a").text("b").text("c").into();

        let script = diff(Some(&old), Some(&new)).unwrap();
        let EditOp::UpdateChildren(edits) = &script[0] else {
            panic!("expected UpdateChildren");
        };
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].ops, vec![EditOp::Insert(VNode::text("b"), 1)]);
        assert_eq!(edits[1].ops, vec![EditOp::Insert(VNode::text("c"), 2)]);
    }

    #[test]
    fn test_nested_child_edit() {
        let old: VNode = div().child(VElement::new("p").text("old")).into();
        let new: VNode = div().child(VElement::new("p").text("new")).into();

        let (script, stats) = diff_with_stats(Some(&old), Some(&new)).unwrap();
        let EditOp::UpdateChildren(edits) = &script[0] else {
            panic!("expected UpdateChildren");
        };
        assert_eq!(edits[0].index, 0);
        // The <p> itself survives; only its text child is replaced.
        let EditOp::UpdateChildren(inner) = &edits[0].ops[0] else {
            panic!("expected nested UpdateChildren");
        };
        assert_eq!(inner[0].ops, vec![EditOp::Replace(VNode::text("new"))]);
        assert!(stats.nodes_compared >= 3);
    }

    #[test]
    fn test_depth_guard() {
        // Same-shaped chains deeper than the guard, differing only at the
        // leaf so neither the equality short-circuit nor a shallow replace
        // stops the recursion.
        let mut old = VElement::new("div").attr("leaf", "1");
        let mut new = VElement::new("div").attr("leaf", "2");
        for _ in 0..(MAX_DIFF_DEPTH + 2) {
            old = VElement::new("div").child(old);
            new = VElement::new("div").child(new);
        }
        let (old, new): (VNode, VNode) = (old.into(), new.into());

        let result = diff(Some(&old), Some(&new));
        assert!(matches!(result, Err(RuntimeError::DepthExceeded { .. })));
    }
}
