//! Host → engine push operations.
//!
//! DESIGN
//! ======
//! `EngineBridge` turns entity-model operations into [`Command`]s. Every push
//! checks readiness first: before bootstrap completes it logs a warning and
//! does nothing, since host code may legitimately race the bootstrap. Engine
//! failures are logged and swallowed here; nothing above this layer sees
//! them.
//!
//! Mirror creation for lines and circles is a build sequence ending in
//! `seal`, after which the engine treats the definition as frozen.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use protocol::Command;
use tracing::warn;

use crate::config::{MapSources, MapType};
use crate::engine::MapEngine;
use crate::model::{Coordinate, CoordinateLine, Extent, Label, MapCircle, Marker};

pub(crate) struct EngineBridge {
    engine: Arc<dyn MapEngine>,
    ready: AtomicBool,
}

impl EngineBridge {
    pub(crate) fn new(engine: Arc<dyn MapEngine>) -> Self {
        Self { engine, ready: AtomicBool::new(false) }
    }

    pub(crate) fn engine(&self) -> &dyn MapEngine {
        self.engine.as_ref()
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    fn push(&self, command: Command) {
        if !self.is_ready() {
            warn!(op = command.name(), "map engine not initialized; dropping command");
            return;
        }
        if let Err(e) = self.engine.execute(&command) {
            warn!(op = command.name(), object = ?command.target(), error = %e, "engine command failed");
        }
    }

    // =========================================================================
    // MIRROR CREATION
    // =========================================================================

    pub(crate) fn create_marker(&self, marker: &Marker, position: Coordinate) {
        self.push(Command::AddMarker {
            id: marker.id().to_owned(),
            url: marker.image_url().to_owned(),
            latitude: position.latitude,
            longitude: position.longitude,
            offset_x: marker.offset_x(),
            offset_y: marker.offset_y(),
        });
    }

    pub(crate) fn create_label(&self, label: &Label, position: Coordinate) {
        self.push(Command::AddLabel {
            id: label.id().to_owned(),
            text: label.text().to_owned(),
            css_class: label.css_class(),
            latitude: position.latitude,
            longitude: position.longitude,
            offset_x: label.offset_x(),
            offset_y: label.offset_y(),
        });
    }

    pub(crate) fn create_coordinate_line(&self, line: &CoordinateLine) {
        let id = line.id().to_owned();
        self.push(Command::GetCoordinateLine { id: id.clone() });
        for c in line.coordinates() {
            self.push(Command::AddCoordinate { id: id.clone(), latitude: c.latitude, longitude: c.longitude });
        }
        self.push(Command::SetColor { id: id.clone(), color: line.color().rgba() });
        self.push(Command::SetFillColor { id: id.clone(), color: line.fill_color().rgba() });
        self.push(Command::SetWidth { id: id.clone(), width: line.width() });
        self.push(Command::SetClosed { id: id.clone(), closed: line.is_closed() });
        self.push(Command::Seal { id });
    }

    pub(crate) fn create_map_circle(&self, circle: &MapCircle) {
        let id = circle.id().to_owned();
        let center = circle.center();
        self.push(Command::GetMapCircle { id: id.clone() });
        self.push(Command::SetCircleCenter { id: id.clone(), latitude: center.latitude, longitude: center.longitude });
        self.push(Command::SetRadius { id: id.clone(), radius: circle.radius_in_meter() });
        self.push(Command::SetColor { id: id.clone(), color: circle.color().rgba() });
        self.push(Command::SetFillColor { id: id.clone(), color: circle.fill_color().rgba() });
        self.push(Command::SetWidth { id: id.clone(), width: circle.width() });
        self.push(Command::Seal { id });
    }

    // =========================================================================
    // OBJECT UPDATES
    // =========================================================================

    pub(crate) fn move_object(&self, id: &str, position: Coordinate) {
        self.push(Command::MoveMapObject {
            id: id.to_owned(),
            latitude: position.latitude,
            longitude: position.longitude,
        });
    }

    pub(crate) fn set_visible(&self, id: &str, visible: bool) {
        let id = id.to_owned();
        self.push(if visible { Command::Show { id } } else { Command::Hide { id } });
    }

    pub(crate) fn set_css_class(&self, id: &str, css_class: &str) {
        self.push(Command::SetCssClass { id: id.to_owned(), css_class: css_class.to_owned() });
    }

    pub(crate) fn set_rotation(&self, id: &str, degrees: i32) {
        self.push(Command::SetRotation { id: id.to_owned(), rotation: degrees.rem_euclid(360) });
    }

    /// Hide, then drop the mirror.
    pub(crate) fn remove(&self, id: &str) {
        self.set_visible(id, false);
        self.push(Command::Remove { id: id.to_owned() });
    }

    // =========================================================================
    // VIEW STATE
    // =========================================================================

    pub(crate) fn set_center(&self, center: Coordinate, animation_ms: u32) {
        self.push(Command::SetCenter { latitude: center.latitude, longitude: center.longitude, animation_ms });
    }

    pub(crate) fn set_zoom(&self, zoom: f64, animation_ms: u32) {
        self.push(Command::SetZoom { zoom, animation_ms });
    }

    /// Push the provider settings `map_type` needs, then switch to it.
    pub(crate) fn set_map_type(&self, map_type: MapType, sources: &MapSources) {
        match map_type {
            t if t.is_bing() => {
                self.push(Command::SetBingMapsApiKey { key: sources.bing_maps_api_key.clone() });
            }
            MapType::Wms => {
                if let Some(wms) = &sources.wms {
                    self.push(Command::SetWmsParamsUrl { url: wms.url.clone() });
                    self.push(Command::ClearWmsParamsParams);
                    for p in &wms.params {
                        self.push(Command::AddWmsParamsParam { key: p.key.clone(), value: p.value.clone() });
                    }
                }
            }
            MapType::Xyz => {
                if let Some(xyz) = &sources.xyz {
                    self.push(Command::SetXyzParams { json: xyz.to_json() });
                }
            }
            _ => {}
        }
        self.push(Command::SetMapType { name: map_type.name().to_owned() });
    }

    pub(crate) fn set_extent(&self, extent: Extent, animation_ms: u32) {
        self.push(Command::SetExtent { bounds: extent.bounds(), animation_ms });
    }

    pub(crate) fn constrain_extent(&self, extent: Extent) {
        self.push(Command::ConstrainExtent { bounds: extent.bounds() });
    }

    pub(crate) fn clear_constrain_extent(&self) {
        self.push(Command::ClearConstrainExtent);
    }
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod tests;
