//! Hydration: adopting server-rendered DOM on the client.
//!
//! The server pass leaves two things behind: marker attributes on every
//! component root and a JSON payload keyed by marker id. The hydrator
//! scans the DOM for markers in document order, replays each record into
//! a live instance (recorded state replaces `initial_state`, `did_mount`
//! does not fire again) and rewires the serialized `data-on-*` event
//! attributes into live bindings. The DOM itself is never mutated beyond
//! attribute rewiring: hydrated markup and client-rendered markup stay
//! byte-identical.
//!
//! Markers are consume-once. Processing a component strips its marker
//! attributes and removes its payload record, so a second scan over the
//! same tree finds nothing to do.

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom::{DomHandle, find_with_attr, visit_elements};
use crate::error::{RuntimeError, RuntimeResult};
use crate::props::{Props, StateMap};
use crate::render::RenderConfig;
use crate::runtime::Runtime;

// =============================================================================
// Payload
// =============================================================================

/// One component's server-recorded identity: everything the client needs
/// to rebuild the instance without re-rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrationRecord {
    /// Registered component name
    pub component: CompactString,
    /// Props the server rendered with
    pub props: Props,
    /// State after `initial_state` on the server
    pub state: StateMap,
}

/// Hydration records keyed by marker id, in server render order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HydrationPayload {
    records: IndexMap<CompactString, HydrationRecord>,
}

impl HydrationPayload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a component under its marker id.
    pub fn insert(&mut self, marker: CompactString, record: HydrationRecord) {
        self.records.insert(marker, record);
    }

    /// Look up a record without consuming it.
    pub fn get(&self, marker: &str) -> Option<&HydrationRecord> {
        self.records.get(marker)
    }

    /// Consume a record. Each marker hydrates at most once.
    pub fn take(&mut self, marker: &str) -> Option<HydrationRecord> {
        self.records.shift_remove(marker)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in server render order.
    pub fn iter(&self) -> impl Iterator<Item = (&CompactString, &HydrationRecord)> {
        self.records.iter()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> RuntimeResult<String> {
        serde_json::to_string(&self.records).map_err(RuntimeError::malformed_payload)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> RuntimeResult<Self> {
        serde_json::from_str(json).map_err(RuntimeError::malformed_payload)
    }

    /// Serialize as an inline script block the client can locate by id.
    pub fn script_block(&self, config: &RenderConfig) -> String {
        let json = self
            .to_json()
            .unwrap_or_else(|_| String::from("{}"))
            .replace('<', "\\u003c");
        format!(
            "<script type=\"application/json\" id=\"{}\">{json}</script>",
            config.payload_script_id
        )
    }
}

// =============================================================================
// Hydrator
// =============================================================================

/// Hydration pass progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationPhase {
    Idle,
    Scanning,
    Complete,
}

/// Outcome counts of one hydration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrationReport {
    /// Instances brought to life
    pub hydrated: usize,
    /// Markers found in the DOM with no payload record
    pub unmatched: usize,
    /// Records naming a component the registry cannot resolve
    pub unresolved: usize,
    /// Payload records whose marker never appeared in the DOM
    pub orphan_records: usize,
}

impl HydrationReport {
    /// Check whether every marker and record paired up.
    pub fn is_clean(&self) -> bool {
        self.unmatched == 0 && self.unresolved == 0 && self.orphan_records == 0
    }
}

/// Scans server markup and adopts its components into a runtime.
pub struct Hydrator {
    config: RenderConfig,
    phase: HydrationPhase,
    on_complete: Option<Box<dyn FnOnce(&HydrationReport)>>,
}

impl std::fmt::Debug for Hydrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hydrator")
            .field("phase", &self.phase)
            .field("has_on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl Default for Hydrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Hydrator {
    /// Create a hydrator with the default marker conventions.
    pub fn new() -> Self {
        Self {
            config: RenderConfig::default(),
            phase: HydrationPhase::Idle,
            on_complete: None,
        }
    }

    /// Override the marker conventions (must match the server's).
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Install a callback fired once the scan completes.
    pub fn on_complete(mut self, callback: impl FnOnce(&HydrationReport) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Current pass progress.
    pub fn phase(&self) -> HydrationPhase {
        self.phase
    }

    /// Adopt every marked component under `root` into the runtime.
    ///
    /// Instances come to life with the recorded props and state; event
    /// attributes become live bindings; marker attributes are stripped.
    /// Unmatched markers and unresolvable records are counted, warned
    /// about and left alone.
    pub fn hydrate(
        &mut self,
        runtime: &mut Runtime,
        root: &DomHandle,
        mut payload: HydrationPayload,
    ) -> RuntimeResult<HydrationReport> {
        self.phase = HydrationPhase::Scanning;
        let mut report = HydrationReport::default();

        for handle in find_with_attr(root, &self.config.marker_attr) {
            let Some(marker) = marker_id(&handle, &self.config) else {
                continue;
            };
            let Some(record) = payload.take(&marker) else {
                tracing::warn!(marker = %marker, "marker has no hydration record");
                report.unmatched += 1;
                continue;
            };
            if runtime.registry().get(&record.component).is_none() {
                tracing::warn!(
                    marker = %marker,
                    component = %record.component,
                    "hydration record names an unregistered component"
                );
                report.unresolved += 1;
                continue;
            }

            let id = runtime.adopt_instance(
                &record.component,
                record.props,
                record.state,
                handle.clone(),
            )?;
            self.rewire(runtime, &handle, id);
            self.consume_marker(&handle);
            report.hydrated += 1;
        }

        for (marker, record) in payload.iter() {
            tracing::warn!(
                marker = %marker,
                component = %record.component,
                "hydration record has no marker in the DOM"
            );
            report.orphan_records += 1;
        }

        self.phase = HydrationPhase::Complete;
        if let Some(callback) = self.on_complete.take() {
            callback(&report);
        }
        Ok(report)
    }

    /// Turn `data-on-*` attributes in the instance's subtree into live
    /// bindings and stamp the elements with their owner. Descendants that
    /// carry their own (still unconsumed) marker belong to a nested
    /// instance and are skipped.
    fn rewire(&self, runtime: &Runtime, root: &DomHandle, id: crate::component::InstanceId) {
        let marker_attr = self.config.marker_attr.clone();
        let events_attr = self.config.events_attr.clone();
        let prefix = self.config.event_attr_prefix.clone();
        visit_elements(root, &mut |handle| {
            let nested = !std::rc::Rc::ptr_eq(handle, root)
                && handle
                    .borrow()
                    .as_element()
                    .is_some_and(|e| e.has_attr(&marker_attr));
            if nested {
                return false;
            }
            runtime.stamp_owner(handle, id);
            if let Some(elem) = handle.borrow_mut().as_element_mut() {
                elem.remove_attr(&events_attr);
                let serialized: Vec<CompactString> = elem
                    .attrs
                    .iter()
                    .filter(|(name, _)| name.starts_with(prefix.as_str()))
                    .map(|(name, _)| name.clone())
                    .collect();
                for name in serialized {
                    let event = CompactString::from(&name[prefix.len()..]);
                    if let Some(crate::dom::DomAttr::Text(method)) = elem.remove_attr(&name) {
                        elem.bind(event, method);
                    }
                }
            }
            true
        });
    }

    fn consume_marker(&self, handle: &DomHandle) {
        if let Some(elem) = handle.borrow_mut().as_element_mut() {
            elem.remove_attr(&self.config.marker_attr);
            elem.remove_attr(&self.config.component_attr);
        }
    }
}

fn marker_id(handle: &DomHandle, config: &RenderConfig) -> Option<CompactString> {
    handle
        .borrow()
        .as_element()
        .and_then(|e| e.attr_text(&config.marker_attr))
        .map(CompactString::from)
}

/// Hydrate with the default conventions.
pub fn hydrate(
    runtime: &mut Runtime,
    root: &DomHandle,
    payload: HydrationPayload,
) -> RuntimeResult<HydrationReport> {
    Hydrator::new().hydrate(runtime, root, payload)
}
