//! Host-side entity model.
//!
//! DESIGN
//! ======
//! Entities are cheap-clone shared handles (`Arc` inside) compared by id.
//! Mutable attributes that must reach the engine live in [`Observable`]
//! cells; the lifecycle registry subscribes to them when an entity is added
//! to a map view and unsubscribes on removal.
//!
//! Precondition failures are reported synchronously as [`ModelError`] and
//! never leave a half-built entity behind.

mod circle;
mod color;
mod coordinate;
mod coordinate_line;
pub(crate) mod element;
pub mod id;
mod label;
mod marker;
pub mod observable;

pub use circle::MapCircle;
pub(crate) use circle::WeakMapCircle;
pub use color::Color;
pub use coordinate::{Coordinate, Extent};
pub use coordinate_line::{CoordinateLine, DEFAULT_LINE_WIDTH};
pub(crate) use coordinate_line::WeakCoordinateLine;
pub use label::Label;
pub(crate) use label::WeakLabel;
pub use marker::{Marker, ProvidedImage};
pub(crate) use marker::WeakMarker;
pub use observable::{ListenerId, Observable};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("label {label} is already attached to marker {marker}")]
    LabelAlreadyAttached { label: String, marker: String },
}
