//! The map view facade.
//!
//! DESIGN
//! ======
//! `MapView` owns the lifecycle registry, the sweeper thread and the view
//! state (center, zoom, map type). View properties are observables whose
//! listeners push into the engine once it is ready; before that, changes are
//! only stored and the whole state is pushed when bootstrap reaches `Ready`.
//!
//! ECHO SUPPRESSION
//! ================
//! A center or zoom reported by the engine is remembered before it is stored
//! in the observable. The listener compares the new value with that memory
//! and, on a match, consumes it instead of pushing it back. Host-originated
//! changes never match and are pushed as usual.
//!
//! Threading: entity and view mutations fire engine pushes synchronously on
//! the calling thread, so callers must already be on the UI context.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use protocol::Callback;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::bootstrap::{self, BootState};
use crate::bridge::EngineBridge;
use crate::config::{BootstrapConfig, Configuration, MapSources, MapType, MapTypeError, WmsParams, XyzParams};
use crate::dispatch::{self, Dispatched};
use crate::engine::MapEngine;
use crate::events::{EventBus, MapEvent};
use crate::model::{Coordinate, CoordinateLine, Extent, Label, ListenerId, MapCircle, Marker, Observable};
use crate::registry::Lifecycle;
use crate::sweeper::{Sweeper, SweeperState};
use crate::ui::UiExecutor;

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 28.0;
pub const DEFAULT_ZOOM: f64 = 14.0;

pub(crate) struct ViewState {
    pub(crate) lifecycle: Arc<Lifecycle>,
    bootstrap: BootstrapConfig,
    boot_state: Mutex<Option<BootState>>,
    pub(crate) initialized: Observable<bool>,
    pub(crate) center: Observable<Coordinate>,
    pub(crate) zoom: Observable<f64>,
    map_type: Observable<MapType>,
    sources: Mutex<MapSources>,
    animation_ms: AtomicU32,
    pub(crate) echo_center: Mutex<Option<Coordinate>>,
    pub(crate) echo_zoom: Mutex<Option<f64>>,
    pub(crate) events: EventBus,
}

impl ViewState {
    fn bridge(&self) -> &EngineBridge {
        &self.lifecycle.bridge
    }

    fn animation_ms(&self) -> u32 {
        self.animation_ms.load(Ordering::Relaxed)
    }

    fn sources(&self) -> MapSources {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push_center(&self, center: Coordinate) {
        let echo = self.echo_center.lock().unwrap_or_else(PoisonError::into_inner).take();
        if echo == Some(center) {
            debug!(%center, "center reported by engine; not pushing back");
            return;
        }
        if !self.bridge().is_ready() {
            debug!(%center, "center stored; pushed once the map is ready");
            return;
        }
        self.bridge().set_center(center, self.animation_ms());
    }

    #[allow(clippy::float_cmp)]
    fn push_zoom(&self, zoom: f64) {
        let echo = self.echo_zoom.lock().unwrap_or_else(PoisonError::into_inner).take();
        if echo == Some(zoom) {
            debug!(zoom, "zoom reported by engine; not pushing back");
            return;
        }
        if !self.bridge().is_ready() {
            debug!(zoom, "zoom stored; pushed once the map is ready");
            return;
        }
        self.bridge().set_zoom(zoom, self.animation_ms());
    }

    fn push_map_type(&self, map_type: MapType) {
        if self.bridge().is_ready() {
            self.bridge().set_map_type(map_type, &self.sources());
        }
    }

    /// Bootstrap reached `Ready`: open the bridge and push the view state.
    fn on_ready(&self) {
        self.bridge().mark_ready();
        self.bridge().set_map_type(self.map_type.get(), &self.sources());
        self.bridge().set_center(self.center.get(), self.animation_ms());
        self.bridge().set_zoom(self.zoom.get(), self.animation_ms());
        self.initialized.set(true);
        info!("map view initialized");
    }
}

pub struct MapView {
    state: Arc<ViewState>,
    sweeper: Sweeper,
}

impl MapView {
    /// Map view over `engine`, with bootstrap tuning read from the environment.
    ///
    /// # Errors
    ///
    /// Fails if the sweeper thread cannot be spawned.
    pub fn new(engine: Arc<dyn MapEngine>, ui: Arc<dyn UiExecutor>) -> std::io::Result<Self> {
        Self::with_bootstrap(engine, ui, BootstrapConfig::from_env())
    }

    /// # Errors
    ///
    /// Fails if the sweeper thread cannot be spawned.
    pub fn with_bootstrap(
        engine: Arc<dyn MapEngine>,
        ui: Arc<dyn UiExecutor>,
        bootstrap: BootstrapConfig,
    ) -> std::io::Result<Self> {
        let (reclaim_tx, reclaim_rx) = mpsc::unbounded_channel();
        let bridge = Arc::new(EngineBridge::new(engine));
        let lifecycle = Arc::new(Lifecycle::new(bridge, reclaim_tx.clone()));
        let sweeper = Sweeper::spawn(Arc::downgrade(&lifecycle), ui, reclaim_tx, reclaim_rx)?;

        let state = Arc::new(ViewState {
            lifecycle,
            bootstrap,
            boot_state: Mutex::new(None),
            initialized: Observable::new(false),
            center: Observable::new(Coordinate::new(0.0, 0.0)),
            zoom: Observable::new(DEFAULT_ZOOM),
            map_type: Observable::new(MapType::default()),
            sources: Mutex::new(MapSources::default()),
            animation_ms: AtomicU32::new(0),
            echo_center: Mutex::new(None),
            echo_zoom: Mutex::new(None),
            events: EventBus::new(),
        });

        let weak = Arc::downgrade(&state);
        state.center.subscribe(move |_, new| {
            if let Some(state) = weak.upgrade() {
                state.push_center(*new);
            }
        });
        let weak = Arc::downgrade(&state);
        state.zoom.subscribe(move |_, new| {
            if let Some(state) = weak.upgrade() {
                state.push_zoom(*new);
            }
        });
        let weak = Arc::downgrade(&state);
        state.map_type.subscribe(move |_, new| {
            if let Some(state) = weak.upgrade() {
                state.push_map_type(*new);
            }
        });

        Ok(Self { state, sweeper })
    }

    // =========================================================================
    // BOOTSTRAP
    // =========================================================================

    /// Load the map document and acquire the connector. Runs once; later
    /// calls return the state of the first run.
    pub fn initialize(&self, configuration: &Configuration) -> BootState {
        {
            let mut boot = self.state.boot_state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(current) = *boot {
                warn!(state = ?current, "map view initialization already started");
                return current;
            }
            *boot = Some(BootState::Loading);
        }

        let end = bootstrap::run(
            self.state.lifecycle.bridge.engine(),
            &self.state.bootstrap,
            configuration,
            |next| *self.state.boot_state.lock().unwrap_or_else(PoisonError::into_inner) = Some(next),
        );
        if end == BootState::Ready {
            self.state.on_ready();
        }
        end
    }

    #[must_use]
    pub fn boot_state(&self) -> Option<BootState> {
        *self.state.boot_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.initialized.get()
    }

    /// Listen for the initialized flag flipping to true.
    pub fn on_initialized<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.state.initialized.subscribe(move |_, new| listener(*new))
    }

    // =========================================================================
    // VIEW STATE
    // =========================================================================

    #[must_use]
    pub fn center(&self) -> Coordinate {
        self.state.center.get()
    }

    pub fn set_center(&self, center: Coordinate) {
        self.state.center.set(center);
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.state.zoom.get()
    }

    /// Values outside `[0, 28]` are ignored.
    pub fn set_zoom(&self, zoom: f64) {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
            debug!(zoom, "zoom out of range; ignored");
            return;
        }
        self.state.zoom.set(zoom);
    }

    #[must_use]
    pub fn map_type(&self) -> MapType {
        self.state.map_type.get()
    }

    /// Switch the map type. The previous type stays when the provider
    /// settings it needs are missing.
    ///
    /// # Errors
    ///
    /// Returns the [`MapTypeError`] naming what is missing.
    pub fn set_map_type(&self, map_type: MapType) -> Result<(), MapTypeError> {
        if let Err(e) = self.state.sources.lock().unwrap_or_else(PoisonError::into_inner).check(map_type) {
            warn!(requested = map_type.name(), current = self.map_type().name(), error = %e, "map type rejected");
            return Err(e);
        }
        self.state.map_type.set(map_type);
        Ok(())
    }

    pub fn set_bing_maps_api_key(&self, key: impl Into<String>) {
        self.state.sources.lock().unwrap_or_else(PoisonError::into_inner).bing_maps_api_key = key.into();
    }

    pub fn set_wms_params(&self, params: Option<WmsParams>) {
        self.state.sources.lock().unwrap_or_else(PoisonError::into_inner).wms = params;
    }

    pub fn set_xyz_params(&self, params: Option<XyzParams>) {
        self.state.sources.lock().unwrap_or_else(PoisonError::into_inner).xyz = params;
    }

    #[must_use]
    pub fn animation_duration_ms(&self) -> u32 {
        self.state.animation_ms()
    }

    /// Animation used for subsequent center, zoom and extent changes.
    pub fn set_animation_duration_ms(&self, millis: u32) {
        self.state.animation_ms.store(millis, Ordering::Relaxed);
    }

    pub fn set_extent(&self, extent: Extent) {
        self.state.bridge().set_extent(extent, self.state.animation_ms());
    }

    pub fn constrain_extent(&self, extent: Extent) {
        self.state.bridge().constrain_extent(extent);
    }

    pub fn clear_constrain_extent(&self) {
        self.state.bridge().clear_constrain_extent();
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    /// Mirror `marker` (and its attached label). Needs a position.
    pub fn add_marker(&self, marker: &Marker) {
        self.state.lifecycle.add_marker(marker);
    }

    pub fn remove_marker(&self, marker: &Marker) {
        self.state.lifecycle.remove_marker(marker);
    }

    /// Mirror a free label. Attached labels follow their marker instead.
    pub fn add_label(&self, label: &Label) {
        self.state.lifecycle.add_label(label);
    }

    pub fn remove_label(&self, label: &Label) {
        self.state.lifecycle.remove_label(label);
    }

    pub fn add_coordinate_line(&self, line: &CoordinateLine) {
        self.state.lifecycle.add_coordinate_line(line);
    }

    pub fn remove_coordinate_line(&self, line: &CoordinateLine) {
        self.state.lifecycle.remove_coordinate_line(line);
    }

    pub fn add_map_circle(&self, circle: &MapCircle) {
        self.state.lifecycle.add_map_circle(circle);
    }

    pub fn remove_map_circle(&self, circle: &MapCircle) {
        self.state.lifecycle.remove_map_circle(circle);
    }

    /// Whether an entity with this id currently has a mirror.
    #[must_use]
    pub fn is_mirrored(&self, id: &str) -> bool {
        self.state.lifecycle.is_registered(id)
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<MapEvent> {
        self.state.events.subscribe()
    }

    pub fn handle_callback(&self, callback: Callback) -> Dispatched {
        dispatch::dispatch(&self.state, callback)
    }

    /// Decode and dispatch a raw `{"callback": .., "args": [..]}` message.
    pub fn handle_callback_json(&self, text: &str) -> Dispatched {
        match protocol::decode_callback(text) {
            Ok(callback) => self.handle_callback(callback),
            Err(e) => {
                warn!(error = %e, "dropping undecodable callback");
                Dispatched::Dropped
            }
        }
    }

    // =========================================================================
    // SHUTDOWN
    // =========================================================================

    #[must_use]
    pub fn sweeper_state(&self) -> SweeperState {
        self.sweeper.state()
    }

    /// Stop the sweeper and wait for it. Mirrors of entities dropped later
    /// are no longer reclaimed.
    pub fn shutdown(&mut self) {
        self.sweeper.stop();
    }
}

#[cfg(test)]
#[path = "map_view_test.rs"]
mod tests;
