//! Convenient re-exports for typical usage.
//!
//! ```
//! use reflow::prelude::*;
//! ```

pub use crate::component::{
    Component, Event, HandlerCtx, HandlerFn, Instance, InstanceId, Scope,
};
pub use crate::diff::{ChildEdit, DiffStats, EditOp, EditScript, diff, diff_with_stats};
pub use crate::dom::{DomAttr, DomHandle, DomNode, outer_html, outer_html_without};
pub use crate::error::{RuntimeError, RuntimeResult};
pub use crate::hooks::{EffectCleanup, HookStore, SlotRef};
pub use crate::hydrate::{
    HydrationPayload, HydrationRecord, HydrationReport, Hydrator, hydrate,
};
pub use crate::node::{Children, NodeKind, VComponent, VElement, VFragment, VNode};
pub use crate::props::{Props, PropsExt, StateMap, Value, props};
pub use crate::registry::{ComponentDef, ComponentRegistry, SharedRegistry};
pub use crate::render::{RenderConfig, ServerOutput, ServerRenderer, render_static};
pub use crate::runtime::Runtime;
