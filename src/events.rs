//! Host-side map events.

use tokio::sync::broadcast;

pub use protocol::Interaction;

use crate::model::{Coordinate, Extent, Label, Marker};

const EVENT_CAPACITY: usize = 256;

/// Typed event raised from an engine callback. Entity events carry the
/// resolved entity, map-level events the raw coordinate or extent.
#[derive(Clone, Debug)]
pub enum MapEvent {
    MapClicked(Coordinate),
    MapRightClicked(Coordinate),
    PointerMoved(Coordinate),
    ExtentSelected(Extent),
    ExtentChanged(Extent),
    Marker { interaction: Interaction, marker: Marker },
    Label { interaction: Interaction, label: Label },
    /// The user followed a link inside the map (e.g. attribution).
    LinkClicked(String),
}

pub(crate) struct EventBus {
    tx: broadcast::Sender<MapEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<MapEvent> {
        self.tx.subscribe()
    }

    /// Returns how many subscribers received the event.
    pub(crate) fn publish(&self, event: MapEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}
