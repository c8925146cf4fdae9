//! Per-kind entity id allocation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Entity kind, used as the id prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Marker,
    Label,
    CoordinateLine,
    MapCircle,
}

impl Kind {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Label => "label",
            Self::CoordinateLine => "coordinateline",
            Self::MapCircle => "mapcircle",
        }
    }

    fn counter(self) -> &'static AtomicU64 {
        static MARKERS: AtomicU64 = AtomicU64::new(1);
        static LABELS: AtomicU64 = AtomicU64::new(1);
        static LINES: AtomicU64 = AtomicU64::new(1);
        static CIRCLES: AtomicU64 = AtomicU64::new(1);
        match self {
            Self::Marker => &MARKERS,
            Self::Label => &LABELS,
            Self::CoordinateLine => &LINES,
            Self::MapCircle => &CIRCLES,
        }
    }
}

/// Allocate the next id for `kind`, e.g. `marker-7`.
///
/// Counters start at 1, only ever increase, and are never reused.
#[must_use]
pub fn next_id(kind: Kind) -> String {
    let n = kind.counter().fetch_add(1, Ordering::Relaxed);
    format!("{}-{n}", kind.prefix())
}

/// Numeric suffix of an id produced by [`next_id`].
#[cfg(test)]
pub(crate) fn sequence_of(id: &str) -> Option<u64> {
    id.rsplit_once('-').and_then(|(_, n)| n.parse().ok())
}

#[cfg(test)]
#[path = "id_test.rs"]
mod tests;
