//! Engine → host callback dispatch.
//!
//! Center and zoom reports update the view observables (with echo
//! suppression, see `map_view`). Entity interactions are resolved through
//! the registry; ids that no longer resolve are dropped silently.

use std::sync::PoisonError;

use protocol::Callback;
use tracing::{debug, info};

use crate::events::MapEvent;
use crate::map_view::ViewState;
use crate::model::{Coordinate, Extent};

/// What a callback turned into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatched {
    /// A [`MapEvent`] was published.
    Event,
    /// A view property was updated.
    Property,
    /// Engine diagnostics, logged only.
    Logged,
    /// Unresolvable id or undecodable message.
    Dropped,
}

#[allow(clippy::float_cmp)]
pub(crate) fn dispatch(view: &ViewState, callback: Callback) -> Dispatched {
    match callback {
        Callback::CenterMovedTo { latitude, longitude } => {
            let center = Coordinate::new(latitude, longitude);
            if view.center.get() != center {
                *view.echo_center.lock().unwrap_or_else(PoisonError::into_inner) = Some(center);
                view.center.set(center);
            }
            Dispatched::Property
        }
        Callback::ZoomChanged { zoom } => {
            let zoom = zoom.round();
            if view.zoom.get() != zoom {
                *view.echo_zoom.lock().unwrap_or_else(PoisonError::into_inner) = Some(zoom);
                view.zoom.set(zoom);
            }
            Dispatched::Property
        }
        Callback::PointerMovedTo { latitude, longitude } => {
            publish(view, MapEvent::PointerMoved(Coordinate::new(latitude, longitude)))
        }
        Callback::SingleClickAt { latitude, longitude } => {
            publish(view, MapEvent::MapClicked(Coordinate::new(latitude, longitude)))
        }
        Callback::ContextClickAt { latitude, longitude } => {
            publish(view, MapEvent::MapRightClicked(Coordinate::new(latitude, longitude)))
        }
        Callback::ExtentSelected(bounds) => publish(view, MapEvent::ExtentSelected(Extent::from_bounds(bounds))),
        Callback::ExtentChanged(bounds) => publish(view, MapEvent::ExtentChanged(Extent::from_bounds(bounds))),
        Callback::Marker { id, interaction } => match view.lifecycle.marker(&id) {
            Some(marker) => publish(view, MapEvent::Marker { interaction, marker }),
            None => {
                debug!(%id, ?interaction, "marker callback for unknown id");
                Dispatched::Dropped
            }
        },
        Callback::Label { id, interaction } => match view.lifecycle.label(&id) {
            Some(label) => publish(view, MapEvent::Label { interaction, label }),
            None => {
                debug!(%id, ?interaction, "label callback for unknown id");
                Dispatched::Dropped
            }
        },
        Callback::Debug(message) => {
            debug!(%message, "engine");
            Dispatched::Logged
        }
        Callback::Console(message) => {
            info!(%message, "engine console");
            Dispatched::Logged
        }
        Callback::ShowLink(href) => publish(view, MapEvent::LinkClicked(href)),
    }
}

fn publish(view: &ViewState, event: MapEvent) -> Dispatched {
    let receivers = view.events.publish(event);
    debug!(receivers, "map event published");
    Dispatched::Event
}
