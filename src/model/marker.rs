//! Marker entity and marker → label attachment.
//!
//! DESIGN
//! ======
//! A marker owns at most one label. While attached, the label's position and
//! visibility are driven by listeners on the marker's own observables; the
//! label's public setters for those two attributes refuse to act. The label
//! keeps only a weak back-reference to its owner, so dropping the marker
//! releases the label as well.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::element::ElementCore;
use super::id::Kind;
use super::label::Label;
use super::observable::ListenerId;
use super::{Coordinate, ModelError};
use crate::sweeper::SweepSignal;

/// Marker images shipped alongside the map document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvidedImage {
    Blue,
    Green,
    Orange,
    Red,
}

impl ProvidedImage {
    /// Image URL relative to the map document.
    #[must_use]
    pub fn url(self) -> &'static str {
        match self {
            Self::Blue => "markers/blue_map_marker.png",
            Self::Green => "markers/green_map_marker.png",
            Self::Orange => "markers/orange_map_marker.png",
            Self::Red => "markers/red_map_marker.png",
        }
    }

    /// Pixel offsets that put the pin tip on the coordinate.
    #[must_use]
    pub fn offsets(self) -> (i32, i32) {
        (-32, -64)
    }
}

struct AttachedLabel {
    label: Label,
    position_listener: ListenerId,
    visible_listener: ListenerId,
}

pub(crate) struct MarkerInner {
    pub(crate) element: ElementCore,
    image_url: String,
    attached: Mutex<Option<AttachedLabel>>,
}

/// Shared handle to a marker. Clones refer to the same marker.
#[derive(Clone)]
pub struct Marker(pub(crate) Arc<MarkerInner>);

#[derive(Clone)]
pub(crate) struct WeakMarker(Weak<MarkerInner>);

impl WeakMarker {
    pub(crate) fn upgrade(&self) -> Option<Marker> {
        self.0.upgrade().map(Marker)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Marker {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArgument`] for an empty image URL.
    pub fn new(image_url: impl Into<String>, offset_x: i32, offset_y: i32) -> Result<Self, ModelError> {
        let image_url = image_url.into();
        if image_url.is_empty() {
            return Err(ModelError::InvalidArgument("marker image url must not be empty".into()));
        }
        Ok(Self(Arc::new(MarkerInner {
            element: ElementCore::new(Kind::Marker, offset_x, offset_y),
            image_url,
            attached: Mutex::new(None),
        })))
    }

    #[must_use]
    pub fn provided(image: ProvidedImage) -> Self {
        let (offset_x, offset_y) = image.offsets();
        Self(Arc::new(MarkerInner {
            element: ElementCore::new(Kind::Marker, offset_x, offset_y),
            image_url: image.url().to_owned(),
            attached: Mutex::new(None),
        }))
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.0.element.entity.id()
    }

    #[must_use]
    pub fn image_url(&self) -> &str {
        &self.0.image_url
    }

    #[must_use]
    pub fn offset_x(&self) -> i32 {
        self.0.element.offset_x
    }

    #[must_use]
    pub fn offset_y(&self) -> i32 {
        self.0.element.offset_y
    }

    #[must_use]
    pub fn position(&self) -> Option<Coordinate> {
        self.0.element.position.get()
    }

    pub fn set_position(&self, position: Coordinate) {
        self.0.element.position.set(Some(position));
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.0.element.entity.visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.0.element.entity.visible.set(visible);
    }

    /// Rotation in degrees, always in `0..360`.
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

    /// `None` resets to the empty class.
    pub fn set_css_class(&self, css_class: Option<&str>) {
        self.0.element.set_css_class(css_class);
    }

    #[must_use]
    pub fn label(&self) -> Option<Label> {
        self.0
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|a| a.label.clone())
    }

    /// Attach `label`, replacing (and detaching) any label attached before.
    ///
    /// The label takes the marker's current position and visibility and then
    /// follows them.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::LabelAlreadyAttached`] when the label belongs to
    /// another live marker.
    pub fn attach_label(&self, label: &Label) -> Result<(), ModelError> {
        {
            let mut owner = label.0.owner.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = owner.as_ref().and_then(Weak::upgrade) {
                if Arc::ptr_eq(&existing, &self.0) {
                    return Ok(());
                }
                return Err(ModelError::LabelAlreadyAttached {
                    label: label.id().to_owned(),
                    marker: existing.element.entity.id().to_owned(),
                });
            }
            *owner = Some(Arc::downgrade(&self.0));
        }

        self.detach_label();

        let element = &self.0.element;
        label.0.element.position.set(element.position.get());
        label.0.element.entity.visible.set(element.entity.visible.get());

        let follower = label.clone();
        let position_listener = element.position.subscribe(move |_, new| {
            follower.0.element.position.set(*new);
        });
        let follower = label.clone();
        let visible_listener = element.entity.visible.subscribe(move |_, new| {
            follower.0.element.entity.visible.set(*new);
        });

        *self.0.attached.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(AttachedLabel { label: label.clone(), position_listener, visible_listener });
        Ok(())
    }

    /// Release the attached label, if any. The label keeps its last position
    /// and visibility.
    pub fn detach_label(&self) -> Option<Label> {
        let attached = self.0.attached.lock().unwrap_or_else(PoisonError::into_inner).take()?;
        let element = &self.0.element;
        element.position.unsubscribe(attached.position_listener);
        element.entity.visible.unsubscribe(attached.visible_listener);
        *attached.label.0.owner.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Some(attached.label)
    }

    pub(crate) fn downgrade(&self) -> WeakMarker {
        WeakMarker(Arc::downgrade(&self.0))
    }

    pub(crate) fn track(&self, tx: &tokio::sync::mpsc::UnboundedSender<SweepSignal>) {
        self.0.element.entity.track(tx);
    }
}

impl PartialEq for Marker {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Marker {}

impl std::hash::Hash for Marker {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marker")
            .field("id", &self.id())
            .field("image_url", &self.image_url())
            .field("position", &self.position())
            .field("visible", &self.is_visible())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "marker_test.rs"]
mod tests;
