//! Geographic value types.

use serde::{Deserialize, Serialize};

use super::ModelError;

/// Latitude/longitude pair in degrees. Equality is by value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Wrap the longitude into `[-180, 180]`, keeping the latitude.
    ///
    /// In-range values are returned unchanged; anything else is reduced by
    /// whole turns in one step, whatever its magnitude. Idempotent.
    #[must_use]
    pub fn normalize(self) -> Self {
        let longitude = self.longitude;
        if !longitude.is_finite() || (-180.0..=180.0).contains(&longitude) {
            return self;
        }
        let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
        Self { latitude: self.latitude, longitude: wrapped }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    min: Coordinate,
    max: Coordinate,
}

impl Extent {
    /// Smallest extent containing every coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArgument`] for fewer than two coordinates.
    pub fn for_coordinates<I>(coordinates: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut iter = coordinates.into_iter();
        let (Some(first), Some(second)) = (iter.next(), iter.next()) else {
            return Err(ModelError::InvalidArgument("an extent needs at least two coordinates".into()));
        };

        let mut extent = Self { min: first, max: first };
        for c in std::iter::once(second).chain(iter) {
            extent.min.latitude = extent.min.latitude.min(c.latitude);
            extent.min.longitude = extent.min.longitude.min(c.longitude);
            extent.max.latitude = extent.max.latitude.max(c.latitude);
            extent.max.longitude = extent.max.longitude.max(c.longitude);
        }
        Ok(extent)
    }

    #[must_use]
    pub fn min(&self) -> Coordinate {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Coordinate {
        self.max
    }

    pub(crate) fn bounds(&self) -> protocol::Bounds {
        protocol::Bounds {
            min_latitude: self.min.latitude,
            min_longitude: self.min.longitude,
            max_latitude: self.max.latitude,
            max_longitude: self.max.longitude,
        }
    }

    pub(crate) fn from_bounds(bounds: protocol::Bounds) -> Self {
        Self {
            min: Coordinate::new(bounds.min_latitude, bounds.min_longitude),
            max: Coordinate::new(bounds.max_latitude, bounds.max_longitude),
        }
    }
}

#[cfg(test)]
#[path = "coordinate_test.rs"]
mod tests;
