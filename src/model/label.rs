//! Text label entity.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::debug;

use super::element::ElementCore;
use super::id::Kind;
use super::marker::{Marker, MarkerInner};
use super::{Coordinate, ModelError};
use crate::sweeper::SweepSignal;

pub(crate) struct LabelInner {
    pub(crate) element: ElementCore,
    text: String,
    pub(crate) owner: Mutex<Option<Weak<MarkerInner>>>,
}

/// Shared handle to a label. Clones refer to the same label.
#[derive(Clone)]
pub struct Label(pub(crate) Arc<LabelInner>);

#[derive(Clone)]
pub(crate) struct WeakLabel(Weak<LabelInner>);

impl WeakLabel {
    pub(crate) fn upgrade(&self) -> Option<Label> {
        self.0.upgrade().map(Label)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Label {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArgument`] for empty text.
    pub fn new(text: impl Into<String>) -> Result<Self, ModelError> {
        Self::with_offsets(text, 0, 0)
    }

    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArgument`] for empty text.
    pub fn with_offsets(text: impl Into<String>, offset_x: i32, offset_y: i32) -> Result<Self, ModelError> {
        let text = text.into();
        if text.is_empty() {
            return Err(ModelError::InvalidArgument("label text must not be empty".into()));
        }
        Ok(Self(Arc::new(LabelInner {
            element: ElementCore::new(Kind::Label, offset_x, offset_y),
            text,
            owner: Mutex::new(None),
        })))
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.0.element.entity.id()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.0.text
    }

    #[must_use]
    pub fn offset_x(&self) -> i32 {
        self.0.element.offset_x
    }

    #[must_use]
    pub fn offset_y(&self) -> i32 {
        self.0.element.offset_y
    }

    /// Marker this label is attached to, if that marker is still alive.
    #[must_use]
    pub fn owner(&self) -> Option<Marker> {
        self.0
            .owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Marker)
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.owner().is_some()
    }

    #[must_use]
    pub fn position(&self) -> Option<Coordinate> {
        self.0.element.position.get()
    }

    /// Ignored while attached; the owning marker drives the position.
    pub fn set_position(&self, position: Coordinate) {
        if self.is_attached() {
            debug!(id = %self.id(), "ignoring position change on attached label");
            return;
        }
        self.0.element.position.set(Some(position));
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.0.element.entity.visible.get()
    }

    /// Ignored while attached; the owning marker drives visibility.
    pub fn set_visible(&self, visible: bool) {
        if self.is_attached() {
            debug!(id = %self.id(), "ignoring visibility change on attached label");
            return;
        }
        self.0.element.entity.visible.set(visible);
    }

    #[must_use]
    pub fn rotation(&self) -> i32 {
        self.0.element.rotation.get()
    }

    pub fn set_rotation(&self, degrees: i32) {
        self.0.element.set_rotation(degrees);
    }

    #[must_use]
    pub fn css_class(&self) -> String {
        self.0.element.css_class.get()
    }

    pub fn set_css_class(&self, css_class: Option<&str>) {
        self.0.element.set_css_class(css_class);
    }

    pub(crate) fn downgrade(&self) -> WeakLabel {
        WeakLabel(Arc::downgrade(&self.0))
    }

    /// Id of the owning marker while it is alive.
    pub(crate) fn owner_id(&self) -> Option<String> {
        self.owner().map(|m| m.id().to_owned())
    }

    /// Still attached to a marker that has since been dropped. Detaching
    /// clears the owner slot, so a detached label never reports this.
    pub(crate) fn owner_dropped(&self) -> bool {
        self.0
            .owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|owner| owner.strong_count() == 0)
    }

    pub(crate) fn track(&self, tx: &tokio::sync::mpsc::UnboundedSender<SweepSignal>) {
        self.0.element.entity.track(tx);
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Label {}

impl std::hash::Hash for Label {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Label")
            .field("id", &self.id())
            .field("text", &self.text())
            .field("position", &self.position())
            .field("visible", &self.is_visible())
            .finish_non_exhaustive()
    }
}
