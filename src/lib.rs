//! Component-based UI runtime: virtual trees, positional diffing, DOM
//! patching and hydration of server-rendered markup.
//!
//! A UI is described as an immutable [`VNode`] tree. The server renders
//! trees to markup plus a JSON hydration payload; the client realizes
//! trees into an in-memory DOM, re-renders components when their state
//! changes, and patches the DOM with the minimal edit script the differ
//! produces. Hydration re-attaches live component instances to markup a
//! server already rendered, without rebuilding the DOM.
//!
//! # Quick start
//!
//! ```
//! use reflow::prelude::*;
//!
//! let tree: VNode = VElement::new("div")
//!     .attr("class", "hero")
//!     .child(VElement::new("h1").text("Welcome"))
//!     .into();
//!
//! assert_eq!(
//!     render_static(&tree).unwrap(),
//!     "<div class=\"hero\"><h1>Welcome</h1></div>"
//! );
//! ```
//!
//! # Components
//!
//! A [`Component`](component::Component) builds a tree from props and
//! state and receives lifecycle calls. Instances live in a
//! [`Runtime`](runtime::Runtime): `set_state` writes coalesce through a
//! dirty-instance scheduler and apply to the DOM at the next `flush`.
//! Event wiring is declarative end to end: an `onClick` prop names a
//! handler method, the DOM stores `(event, method)` pairs, and
//! `dispatch` resolves the method through the component's handler table.
//!
//! # Server to client
//!
//! [`ServerRenderer`](render::ServerRenderer) stamps every component
//! root with marker attributes and records props and state in a payload
//! keyed by marker id. [`hydrate`](hydrate::hydrate) scans for markers,
//! replays each record into a live instance and turns serialized event
//! attributes into bindings. Markers are consumed as they are processed,
//! so hydration is idempotent.

pub mod component;
pub mod diff;
pub mod dom;
pub mod error;
pub mod hooks;
pub mod hydrate;
pub mod node;
pub mod patch;
pub mod prelude;
pub mod props;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod schedule;

pub use component::{Component, Event, InstanceId, Scope};
pub use diff::{EditOp, EditScript, diff};
pub use error::{RuntimeError, RuntimeResult};
pub use hydrate::{HydrationPayload, HydrationReport, Hydrator, hydrate};
pub use node::{VComponent, VElement, VFragment, VNode};
pub use props::{Props, StateMap, Value, props};
pub use registry::{ComponentDef, SharedRegistry};
pub use render::{RenderConfig, ServerRenderer, render_static};
pub use runtime::Runtime;
