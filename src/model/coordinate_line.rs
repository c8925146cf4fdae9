//! Polyline / polygon entity.
//!
//! The vertex list is copied at construction. Style attributes are read when
//! the mirror is created; changing them later only shows after the line is
//! removed and added again. Visibility is the one live attribute.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::element::EntityCore;
use super::id::Kind;
use super::{Color, Coordinate};
use crate::sweeper::SweepSignal;

pub const DEFAULT_LINE_WIDTH: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
struct LineStyle {
    color: Color,
    fill_color: Color,
    width: u32,
    closed: bool,
}

pub(crate) struct CoordinateLineInner {
    pub(crate) entity: EntityCore,
    coordinates: Vec<Coordinate>,
    style: Mutex<LineStyle>,
}

#[derive(Clone)]
pub struct CoordinateLine(pub(crate) Arc<CoordinateLineInner>);

#[derive(Clone)]
pub(crate) struct WeakCoordinateLine(Weak<CoordinateLineInner>);

impl WeakCoordinateLine {
    pub(crate) fn upgrade(&self) -> Option<CoordinateLine> {
        self.0.upgrade().map(CoordinateLine)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl CoordinateLine {
    pub fn new(coordinates: &[Coordinate]) -> Self {
        Self(Arc::new(CoordinateLineInner {
            entity: EntityCore::new(Kind::CoordinateLine),
            coordinates: coordinates.to_vec(),
            style: Mutex::new(LineStyle {
                color: Color::RED.translucent(0.7),
                fill_color: Color::RED.translucent(0.3),
                width: DEFAULT_LINE_WIDTH,
                closed: false,
            }),
        }))
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.0.entity.id()
    }

    #[must_use]
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.0.coordinates
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.0.entity.visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.0.entity.visible.set(visible);
    }

    fn style(&self) -> LineStyle {
        *self.0.style.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut LineStyle)) -> &Self {
        f(&mut self.0.style.lock().unwrap_or_else(PoisonError::into_inner));
        self
    }

    #[must_use]
    pub fn color(&self) -> Color {
        self.style().color
    }

    pub fn set_color(&self, color: Color) -> &Self {
        self.update(|s| s.color = color)
    }

    /// Fill used when the line is closed into a polygon.
    #[must_use]
    pub fn fill_color(&self) -> Color {
        self.style().fill_color
    }

    pub fn set_fill_color(&self, color: Color) -> &Self {
        self.update(|s| s.fill_color = color)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.style().width
    }

    pub fn set_width(&self, width: u32) -> &Self {
        self.update(|s| s.width = width)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.style().closed
    }

    pub fn set_closed(&self, closed: bool) -> &Self {
        self.update(|s| s.closed = closed)
    }

    pub(crate) fn downgrade(&self) -> WeakCoordinateLine {
        WeakCoordinateLine(Arc::downgrade(&self.0))
    }

    pub(crate) fn track(&self, tx: &tokio::sync::mpsc::UnboundedSender<SweepSignal>) {
        self.0.entity.track(tx);
    }
}

impl PartialEq for CoordinateLine {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for CoordinateLine {}

impl std::hash::Hash for CoordinateLine {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for CoordinateLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateLine")
            .field("id", &self.id())
            .field("coordinates", &self.coordinates().len())
            .field("visible", &self.is_visible())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "coordinate_line_test.rs"]
mod tests;
