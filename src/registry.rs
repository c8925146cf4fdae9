//! Registry of mirrored entities and their lifecycle.
//!
//! DESIGN
//! ======
//! Three registries, one per mirror family: position-bearing elements
//! (markers and labels), coordinate lines, circles. Each maps an entity id to
//! a weak handle plus the listener ids attached to that entity, and each is
//! guarded by its own lock. An id is present exactly while its mirror exists
//! in the engine.
//!
//! Listeners only ever call into the bridge, never back into a registry, so
//! subscribing while a registry lock is held cannot deadlock.
//!
//! LABEL OWNERSHIP
//! ===============
//! A label attached to a marker rides on the marker: it is added when the
//! marker is added (or later, once the marker is registered) and removed with
//! it. Adding it before its marker is a no-op, and removing it directly while
//! attached is refused.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bridge::EngineBridge;
use crate::model::element::ElementCore;
use crate::model::{
    CoordinateLine, Label, ListenerId, MapCircle, Marker, WeakCoordinateLine, WeakLabel, WeakMapCircle, WeakMarker,
};
use crate::sweeper::SweepSignal;

// =============================================================================
// GENERIC REGISTRY
// =============================================================================

pub(crate) trait Tracked {
    fn is_alive(&self) -> bool;
    /// Unsubscribe every listener, if the entity is still reachable.
    fn detach(&self);
}

pub(crate) struct Registry<T> {
    entries: Mutex<HashMap<String, T>>,
}

impl<T: Tracked> Registry<T> {
    fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Insert the entry built by `make` unless `id` is present. The check and
    /// the insert happen under one lock.
    fn insert_with(&self, id: &str, make: impl FnOnce() -> T) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(id) {
            return false;
        }
        entries.insert(id.to_owned(), make());
        true
    }

    fn take(&self, id: &str) -> Option<T> {
        self.lock().remove(id)
    }

    fn with<R>(&self, id: &str, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.lock().get(id).map(f)
    }

    fn ids_where(&self, pred: impl Fn(&T) -> bool) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, entry)| pred(entry))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids whose entity has been dropped by the host.
    pub(crate) fn dead_ids(&self) -> Vec<String> {
        self.ids_where(|entry| !entry.is_alive())
    }
}

// =============================================================================
// TRACKED ENTRIES
// =============================================================================

enum ElementHandle {
    Marker(WeakMarker),
    Label(WeakLabel),
}

struct ElementListeners {
    position: ListenerId,
    visible: ListenerId,
    css_class: ListenerId,
    rotation: ListenerId,
}

pub(crate) struct TrackedElement {
    handle: ElementHandle,
    listeners: ElementListeners,
    /// Owning marker id for attached labels, as of registration. May be stale
    /// after a detach; see [`TrackedElement::rides_on`].
    owner: Option<String>,
}

impl TrackedElement {
    /// Label registered under `marker_id` that is still attached to it, now
    /// that the marker is gone. A label detached in the meantime is free and
    /// does not ride along.
    fn rides_on(&self, marker_id: &str) -> bool {
        if self.owner.as_deref() != Some(marker_id) {
            return false;
        }
        match &self.handle {
            ElementHandle::Label(l) => l.upgrade().as_ref().is_none_or(Label::owner_dropped),
            ElementHandle::Marker(_) => false,
        }
    }

    fn unsubscribe(&self, element: &ElementCore) {
        element.position.unsubscribe(self.listeners.position);
        element.entity.visible.unsubscribe(self.listeners.visible);
        element.css_class.unsubscribe(self.listeners.css_class);
        element.rotation.unsubscribe(self.listeners.rotation);
    }
}

impl Tracked for TrackedElement {
    fn is_alive(&self) -> bool {
        match &self.handle {
            ElementHandle::Marker(m) => m.is_alive(),
            ElementHandle::Label(l) => l.is_alive(),
        }
    }

    fn detach(&self) {
        match &self.handle {
            ElementHandle::Marker(m) => {
                if let Some(marker) = m.upgrade() {
                    self.unsubscribe(&marker.0.element);
                }
            }
            ElementHandle::Label(l) => {
                if let Some(label) = l.upgrade() {
                    self.unsubscribe(&label.0.element);
                }
            }
        }
    }
}

pub(crate) struct TrackedLine {
    handle: WeakCoordinateLine,
    visible: ListenerId,
}

impl Tracked for TrackedLine {
    fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    fn detach(&self) {
        if let Some(line) = self.handle.upgrade() {
            line.0.entity.visible.unsubscribe(self.visible);
        }
    }
}

pub(crate) struct TrackedCircle {
    handle: WeakMapCircle,
    visible: ListenerId,
}

impl Tracked for TrackedCircle {
    fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    fn detach(&self) {
        if let Some(circle) = self.handle.upgrade() {
            circle.0.entity.visible.unsubscribe(self.visible);
        }
    }
}

/// Ids of dropped entities, per registry.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ReclaimSet {
    pub(crate) elements: Vec<String>,
    pub(crate) lines: Vec<String>,
    pub(crate) circles: Vec<String>,
}

impl ReclaimSet {
    pub(crate) fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.lines.is_empty() && self.circles.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.elements.len() + self.lines.len() + self.circles.len()
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

pub(crate) struct Lifecycle {
    pub(crate) bridge: Arc<EngineBridge>,
    pub(crate) elements: Registry<TrackedElement>,
    pub(crate) lines: Registry<TrackedLine>,
    pub(crate) circles: Registry<TrackedCircle>,
    reclaim_tx: mpsc::UnboundedSender<SweepSignal>,
}

impl Lifecycle {
    pub(crate) fn new(bridge: Arc<EngineBridge>, reclaim_tx: mpsc::UnboundedSender<SweepSignal>) -> Self {
        Self {
            bridge,
            elements: Registry::new(),
            lines: Registry::new(),
            circles: Registry::new(),
            reclaim_tx,
        }
    }

    fn ready(&self, op: &'static str, id: &str) -> bool {
        if self.bridge.is_ready() {
            return true;
        }
        warn!(op, %id, "map view not initialized; ignoring");
        false
    }

    #[cfg(test)]
    pub(crate) fn reclaim_sender(&self) -> mpsc::UnboundedSender<SweepSignal> {
        self.reclaim_tx.clone()
    }

    /// Any registry holds `id`.
    pub(crate) fn is_registered(&self, id: &str) -> bool {
        self.elements.contains(id) || self.lines.contains(id) || self.circles.contains(id)
    }

    // =========================================================================
    // ELEMENTS
    // =========================================================================

    fn subscribe_element(&self, id: &str, element: &ElementCore) -> ElementListeners {
        let (bridge, oid) = (Arc::clone(&self.bridge), id.to_owned());
        let position = element.position.subscribe(move |_, new| {
            if let Some(position) = new {
                bridge.move_object(&oid, *position);
            }
        });
        let (bridge, oid) = (Arc::clone(&self.bridge), id.to_owned());
        let visible = element.entity.visible.subscribe(move |_, new| bridge.set_visible(&oid, *new));
        let (bridge, oid) = (Arc::clone(&self.bridge), id.to_owned());
        let css_class = element.css_class.subscribe(move |_, new| bridge.set_css_class(&oid, new));
        let (bridge, oid) = (Arc::clone(&self.bridge), id.to_owned());
        let rotation = element.rotation.subscribe(move |_, new| bridge.set_rotation(&oid, *new));
        ElementListeners { position, visible, css_class, rotation }
    }

    /// Push state that the create call does not carry.
    fn sync_element(&self, id: &str, element: &ElementCore) {
        self.bridge.set_visible(id, element.entity.visible.get());
        self.bridge.set_rotation(id, element.rotation.get());
        let css_class = element.css_class.get();
        if !css_class.is_empty() {
            self.bridge.set_css_class(id, &css_class);
        }
    }

    pub(crate) fn add_marker(&self, marker: &Marker) {
        let id = marker.id();
        if !self.ready("add_marker", id) {
            return;
        }
        let Some(position) = marker.position() else {
            warn!(%id, "marker has no position; not added");
            return;
        };
        let element = &marker.0.element;
        let inserted = self.elements.insert_with(id, || TrackedElement {
            handle: ElementHandle::Marker(marker.downgrade()),
            listeners: self.subscribe_element(id, element),
            owner: None,
        });
        if !inserted {
            debug!(%id, "marker already registered");
            return;
        }
        marker.track(&self.reclaim_tx);
        self.bridge.create_marker(marker, position);
        self.sync_element(id, element);

        if let Some(label) = marker.label() {
            self.add_label(&label);
        }
    }

    pub(crate) fn add_label(&self, label: &Label) {
        let id = label.id();
        if !self.ready("add_label", id) {
            return;
        }
        let owner = label.owner_id();
        if let Some(owner) = &owner {
            if !self.elements.contains(owner) {
                debug!(%id, %owner, "owning marker not registered; label not added");
                return;
            }
        }
        let Some(position) = label.position() else {
            warn!(%id, "label has no position; not added");
            return;
        };
        let element = &label.0.element;
        let inserted = self.elements.insert_with(id, || TrackedElement {
            handle: ElementHandle::Label(label.downgrade()),
            listeners: self.subscribe_element(id, element),
            owner,
        });
        if !inserted {
            debug!(%id, "label already registered");
            return;
        }
        label.track(&self.reclaim_tx);
        self.bridge.create_label(label, position);
        self.sync_element(id, element);
    }

    /// Hide and drop the mirror, then detach listeners. No-op for unknown ids.
    fn remove_element(&self, id: &str) {
        let Some(entry) = self.elements.take(id) else {
            return;
        };
        self.bridge.remove(id);
        entry.detach();
    }

    pub(crate) fn remove_marker(&self, marker: &Marker) {
        if !self.ready("remove_marker", marker.id()) {
            return;
        }
        if let Some(label) = marker.label() {
            self.remove_element(label.id());
        }
        self.remove_element(marker.id());
    }

    pub(crate) fn remove_label(&self, label: &Label) {
        let id = label.id();
        if !self.ready("remove_label", id) {
            return;
        }
        if label.is_attached() {
            warn!(%id, "label is attached to a marker; remove the marker instead");
            return;
        }
        self.remove_element(id);
    }

    pub(crate) fn marker(&self, id: &str) -> Option<Marker> {
        self.elements
            .with(id, |entry| match &entry.handle {
                ElementHandle::Marker(m) => m.upgrade(),
                ElementHandle::Label(_) => None,
            })
            .flatten()
    }

    pub(crate) fn label(&self, id: &str) -> Option<Label> {
        self.elements
            .with(id, |entry| match &entry.handle {
                ElementHandle::Label(l) => l.upgrade(),
                ElementHandle::Marker(_) => None,
            })
            .flatten()
    }

    // =========================================================================
    // LINES AND CIRCLES
    // =========================================================================

    pub(crate) fn add_coordinate_line(&self, line: &CoordinateLine) {
        let id = line.id();
        if !self.ready("add_coordinate_line", id) {
            return;
        }
        let inserted = self.lines.insert_with(id, || {
            let (bridge, oid) = (Arc::clone(&self.bridge), id.to_owned());
            TrackedLine {
                handle: line.downgrade(),
                visible: line.0.entity.visible.subscribe(move |_, new| bridge.set_visible(&oid, *new)),
            }
        });
        if !inserted {
            debug!(%id, "coordinate line already registered");
            return;
        }
        line.track(&self.reclaim_tx);
        self.bridge.create_coordinate_line(line);
        self.bridge.set_visible(id, line.is_visible());
    }

    pub(crate) fn remove_coordinate_line(&self, line: &CoordinateLine) {
        if self.ready("remove_coordinate_line", line.id()) {
            self.remove_line(line.id());
        }
    }

    fn remove_line(&self, id: &str) {
        let Some(entry) = self.lines.take(id) else {
            return;
        };
        self.bridge.remove(id);
        entry.detach();
    }

    pub(crate) fn add_map_circle(&self, circle: &MapCircle) {
        let id = circle.id();
        if !self.ready("add_map_circle", id) {
            return;
        }
        let inserted = self.circles.insert_with(id, || {
            let (bridge, oid) = (Arc::clone(&self.bridge), id.to_owned());
            TrackedCircle {
                handle: circle.downgrade(),
                visible: circle.0.entity.visible.subscribe(move |_, new| bridge.set_visible(&oid, *new)),
            }
        });
        if !inserted {
            debug!(%id, "map circle already registered");
            return;
        }
        circle.track(&self.reclaim_tx);
        self.bridge.create_map_circle(circle);
        self.bridge.set_visible(id, circle.is_visible());
    }

    pub(crate) fn remove_map_circle(&self, circle: &MapCircle) {
        if self.ready("remove_map_circle", circle.id()) {
            self.remove_circle(circle.id());
        }
    }

    fn remove_circle(&self, id: &str) {
        let Some(entry) = self.circles.take(id) else {
            return;
        };
        self.bridge.remove(id);
        entry.detach();
    }

    // =========================================================================
    // RECLAIM
    // =========================================================================

    /// Scan every registry for dropped entities. Each scan holds that
    /// registry's lock.
    pub(crate) fn dead_ids(&self) -> ReclaimSet {
        ReclaimSet {
            elements: self.elements.dead_ids(),
            lines: self.lines.dead_ids(),
            circles: self.circles.dead_ids(),
        }
    }

    /// Remove mirrors of dropped entities. A reclaimed marker takes along
    /// the labels still attached to it.
    pub(crate) fn remove_reclaimed(&self, reclaimed: ReclaimSet) {
        for id in &reclaimed.elements {
            for label_id in self.elements.ids_where(|e| e.rides_on(id)) {
                self.remove_element(&label_id);
            }
            self.remove_element(id);
        }
        for id in &reclaimed.lines {
            self.remove_line(id);
        }
        for id in &reclaimed.circles {
            self.remove_circle(id);
        }
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
