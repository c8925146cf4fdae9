//! Host-side object synchronization for an embedded map engine, plus an
//! offline tile cache.
//!
//! The host owns markers, labels, coordinate lines and circles as plain Rust
//! values. A [`MapView`] mirrors the ones registered with it into a map
//! engine (an OpenLayers page in a web view, or anything else implementing
//! [`MapEngine`]) by sending typed [`Command`]s, and turns the engine's
//! [`Callback`]s back into [`MapEvent`]s. Entities the host drops are swept
//! out of the engine in the background.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`model`] | Entities, coordinates, colors, observable properties, id allocation |
//! | [`map_view`] | The [`MapView`] facade |
//! | [`dispatch`] | Engine callback handling |
//! | [`events`] | [`MapEvent`] and the event bus |
//! | [`engine`] | [`MapEngine`] seam and the channel-backed engine |
//! | [`bootstrap`] | Document load and connector retry sequencing |
//! | [`sweeper`] | Background removal of dropped entities |
//! | [`ui`] | UI-thread executor seam |
//! | [`config`] | Map configuration, map types, env-driven tuning |
//! | [`offline`] | Disk tile cache and caching HTTP client |

pub mod bootstrap;
mod bridge;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod events;
pub mod map_view;
pub mod model;
pub mod offline;
mod registry;
pub mod sweeper;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use bootstrap::BootState;
pub use config::{
    BootstrapConfig, Configuration, MapSources, MapType, MapTypeError, Projection, WmsParam, WmsParams, XyzParams,
};
pub use dispatch::Dispatched;
pub use engine::{ChannelEngine, EngineError, EngineRequest, MapEngine};
pub use events::{Interaction, MapEvent};
pub use map_view::MapView;
pub use model::{
    Color, Coordinate, CoordinateLine, Extent, Label, ListenerId, MapCircle, Marker, ModelError, Observable,
    ProvidedImage,
};
pub use offline::{CacheConfig, CacheError, CachingClient, OfflineCache};
pub use protocol::{Callback, Command};
pub use sweeper::SweeperState;
pub use ui::{InlineExecutor, UiExecutor, UiQueue};
