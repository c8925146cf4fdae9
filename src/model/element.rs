//! State shared by every entity kind.
//!
//! DESIGN
//! ======
//! `EntityCore` carries the id, the `visible` observable and the reclaim
//! trackers. It lives inside the entity's shared allocation, so its `Drop`
//! runs exactly when the last host handle goes away; at that point the id is
//! sent to every tracker. The sweeper listens on that channel instead of
//! polling the registries.
//!
//! `ElementCore` adds the attributes of position-bearing entities (markers
//! and labels).

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

use super::Coordinate;
use super::id::{Kind, next_id};
use super::observable::Observable;
use crate::sweeper::SweepSignal;

pub(crate) struct EntityCore {
    id: String,
    pub(crate) visible: Observable<bool>,
    trackers: Mutex<Vec<mpsc::UnboundedSender<SweepSignal>>>,
}

impl EntityCore {
    pub(crate) fn new(kind: Kind) -> Self {
        Self {
            id: next_id(kind),
            visible: Observable::new(false),
            trackers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Register a reclaim channel. Registering the same channel twice is a no-op.
    pub(crate) fn track(&self, tx: &mpsc::UnboundedSender<SweepSignal>) {
        let mut trackers = self.trackers.lock().unwrap_or_else(PoisonError::into_inner);
        if !trackers.iter().any(|t| t.same_channel(tx)) {
            trackers.push(tx.clone());
        }
    }
}

impl Drop for EntityCore {
    fn drop(&mut self) {
        let trackers = self.trackers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for tx in trackers.drain(..) {
            // A closed channel means the sweeper is gone; nothing left to notify.
            let _ = tx.send(SweepSignal::Reclaimed(self.id.clone()));
        }
    }
}

pub(crate) struct ElementCore {
    pub(crate) entity: EntityCore,
    pub(crate) position: Observable<Option<Coordinate>>,
    pub(crate) offset_x: i32,
    pub(crate) offset_y: i32,
    pub(crate) rotation: Observable<i32>,
    pub(crate) css_class: Observable<String>,
}

impl ElementCore {
    pub(crate) fn new(kind: Kind, offset_x: i32, offset_y: i32) -> Self {
        Self {
            entity: EntityCore::new(kind),
            position: Observable::new(None),
            offset_x,
            offset_y,
            rotation: Observable::new(0),
            css_class: Observable::new(String::new()),
        }
    }

    pub(crate) fn set_rotation(&self, degrees: i32) {
        self.rotation.set(degrees.rem_euclid(360));
    }

    pub(crate) fn set_css_class(&self, css_class: Option<&str>) {
        self.css_class.set(css_class.unwrap_or_default().to_owned());
    }
}
