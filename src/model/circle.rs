//! Circle entity. Same live/sealed split as [`super::CoordinateLine`].

use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::element::EntityCore;
use super::id::Kind;
use super::{Color, Coordinate};
use crate::sweeper::SweepSignal;

#[derive(Clone, Copy, Debug, PartialEq)]
struct CircleShape {
    center: Coordinate,
    radius_in_meter: f64,
    color: Color,
    fill_color: Color,
    width: u32,
}

pub(crate) struct MapCircleInner {
    pub(crate) entity: EntityCore,
    shape: Mutex<CircleShape>,
}

#[derive(Clone)]
pub struct MapCircle(pub(crate) Arc<MapCircleInner>);

#[derive(Clone)]
pub(crate) struct WeakMapCircle(Weak<MapCircleInner>);

impl WeakMapCircle {
    pub(crate) fn upgrade(&self) -> Option<MapCircle> {
        self.0.upgrade().map(MapCircle)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl MapCircle {
    pub fn new(center: Coordinate, radius_in_meter: f64) -> Self {
        Self(Arc::new(MapCircleInner {
            entity: EntityCore::new(Kind::MapCircle),
            shape: Mutex::new(CircleShape {
                center,
                radius_in_meter,
                color: Color::LIME_GREEN.translucent(0.7),
                fill_color: Color::DARK_ORANGE.translucent(0.3),
                width: super::coordinate_line::DEFAULT_LINE_WIDTH,
            }),
        }))
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.0.entity.id()
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.0.entity.visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.0.entity.visible.set(visible);
    }

    fn shape(&self) -> CircleShape {
        *self.0.shape.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut CircleShape)) -> &Self {
        f(&mut self.0.shape.lock().unwrap_or_else(PoisonError::into_inner));
        self
    }

    #[must_use]
    pub fn center(&self) -> Coordinate {
        self.shape().center
    }

    pub fn set_center(&self, center: Coordinate) -> &Self {
        self.update(|s| s.center = center)
    }

    #[must_use]
    pub fn radius_in_meter(&self) -> f64 {
        self.shape().radius_in_meter
    }

    pub fn set_radius_in_meter(&self, radius: f64) -> &Self {
        self.update(|s| s.radius_in_meter = radius)
    }

    #[must_use]
    pub fn color(&self) -> Color {
        self.shape().color
    }

    pub fn set_color(&self, color: Color) -> &Self {
        self.update(|s| s.color = color)
    }

    #[must_use]
    pub fn fill_color(&self) -> Color {
        self.shape().fill_color
    }

    pub fn set_fill_color(&self, color: Color) -> &Self {
        self.update(|s| s.fill_color = color)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.shape().width
    }

    pub fn set_width(&self, width: u32) -> &Self {
        self.update(|s| s.width = width)
    }

    pub(crate) fn downgrade(&self) -> WeakMapCircle {
        WeakMapCircle(Arc::downgrade(&self.0))
    }

    pub(crate) fn track(&self, tx: &tokio::sync::mpsc::UnboundedSender<SweepSignal>) {
        self.0.entity.track(tx);
    }
}

impl PartialEq for MapCircle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for MapCircle {}

impl std::hash::Hash for MapCircle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for MapCircle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapCircle")
            .field("id", &self.id())
            .field("center", &self.center())
            .field("radius_in_meter", &self.radius_in_meter())
            .finish_non_exhaustive()
    }
}
