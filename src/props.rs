//! Prop system for virtual nodes.
//!
//! Props are an ordered string-to-value mapping. Insertion order is
//! preserved (attributes render in declaration order) while equality is
//! order-independent, which is exactly what the differ needs for its
//! deep prop comparison.
//!
//! Two prop names are special:
//! - `key` is reserved for list identity and never rendered as an attribute
//! - names matching `on` + uppercase letter (`onClick`, `onSubmit`) declare
//!   event handlers; their value is a handler *method name*, never a closure

use compact_str::{CompactString, format_compact};
use indexmap::IndexMap;

pub use serde_json::Value;

/// Ordered prop map for a virtual node.
pub type Props = IndexMap<CompactString, Value>;

/// State mapping of a component instance (same shape as props).
pub type StateMap = IndexMap<CompactString, Value>;

/// Reserved prop name for list identity.
pub const KEY_PROP: &str = "key";

// =============================================================================
// Event prop conventions
// =============================================================================

/// Check whether a prop name declares an event handler (`onClick`, `onInput`).
pub fn is_event_prop(name: &str) -> bool {
    name.len() > 2
        && name.starts_with("on")
        && name.as_bytes()[2].is_ascii_uppercase()
}

/// Extract the DOM event name from a handler prop name.
///
/// `onClick` becomes `click`, `onDblClick` becomes `dblclick`.
pub fn event_name(prop: &str) -> Option<CompactString> {
    if !is_event_prop(prop) {
        return None;
    }
    Some(format_compact!("{}", prop[2..].to_lowercase()))
}

// =============================================================================
// Attribute rendering rules
// =============================================================================

/// How a prop value renders as an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrText {
    /// Boolean `true`: a bare attribute (`disabled`)
    Bare,
    /// Everything else: an attribute with a textual value
    Text(String),
}

/// Map a prop value to its attribute rendering.
///
/// `Null` and `false` omit the attribute entirely; `true` renders bare;
/// strings render verbatim; numbers and compound values render via their
/// JSON representation.
pub fn attr_text(value: &Value) -> Option<AttrText> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some(AttrText::Bare),
        Value::String(s) => Some(AttrText::Text(s.clone())),
        other => Some(AttrText::Text(other.to_string())),
    }
}

// =============================================================================
// PropsExt
// =============================================================================

/// Extension trait for convenient prop access.
pub trait PropsExt {
    /// Get a prop as a string slice, if present and a string.
    fn get_str(&self, name: &str) -> Option<&str>;

    /// Get the reserved `key` prop, if any.
    fn key(&self) -> Option<&str>;

    /// Iterate event-handler declarations as `(event, method)` pairs,
    /// in insertion order.
    fn event_handlers(&self) -> Vec<(CompactString, CompactString)>;
}

impl PropsExt for Props {
    fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    fn key(&self) -> Option<&str> {
        self.get_str(KEY_PROP)
    }

    fn event_handlers(&self) -> Vec<(CompactString, CompactString)> {
        let mut out = Vec::new();
        for (name, value) in self {
            let Some(event) = event_name(name) else { continue };
            let Some(method) = value.as_str() else {
                tracing::warn!(prop = %name, "event prop value is not a method name string");
                continue;
            };
            out.push((event, CompactString::from(method)));
        }
        out
    }
}

/// Build a prop map from `(name, value)` pairs.
pub fn props<N, V, I>(pairs: I) -> Props
where
    N: Into<CompactString>,
    V: Into<Value>,
    I: IntoIterator<Item = (N, V)>,
{
    pairs
        .into_iter()
        .map(|(n, v)| (n.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_prop_detection() {
        assert!(is_event_prop("onClick"));
        assert!(is_event_prop("onSubmit"));
        assert!(!is_event_prop("on")); // too short
        assert!(!is_event_prop("once")); // lowercase third char
        assert!(!is_event_prop("class"));
    }

    #[test]
    fn test_event_name() {
        assert_eq!(event_name("onClick").as_deref(), Some("click"));
        assert_eq!(event_name("onDblClick").as_deref(), Some("dblclick"));
        assert_eq!(event_name("title"), None);
    }

    #[test]
    fn test_attr_text_rules() {
        assert_eq!(attr_text(&Value::Null), None);
        assert_eq!(attr_text(&Value::Bool(false)), None);
        assert_eq!(attr_text(&Value::Bool(true)), Some(AttrText::Bare));
        assert_eq!(
            attr_text(&Value::from("hero")),
            Some(AttrText::Text("hero".to_string()))
        );
        assert_eq!(
            attr_text(&Value::from(42)),
            Some(AttrText::Text("42".to_string()))
        );
    }

    #[test]
    fn test_props_equality_is_order_independent() {
        let a = props([("class", "hero"), ("id", "main")]);
        let b = props([("id", "main"), ("class", "hero")]);
        assert_eq!(a, b);

        // ...but insertion order is preserved for rendering
        let keys: Vec<_> = a.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["class", "id"]);
    }

    #[test]
    fn test_event_handlers() {
        let p = props([("onClick", "increment"), ("class", "btn"), ("onBlur", "save")]);
        let handlers = p.event_handlers();
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].0, "click");
        assert_eq!(handlers[0].1, "increment");
        assert_eq!(handlers[1].0, "blur");
    }
}
