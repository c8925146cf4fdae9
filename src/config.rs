//! Map configuration, map type sources, and environment tuning.
//!
//! DESIGN
//! ======
//! [`Configuration`] is the payload handed to the engine when the connector is
//! acquired. [`MapType`] plus [`MapSources`] describe which tile source is
//! shown; `MapSources::check` is the single place that decides whether a map
//! type has what it needs (API key, WMS url, XYZ url).
//!
//! Tuning knobs for bootstrap come from the environment with typed defaults,
//! the same `env_parse` pattern used for every other knob in this crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// CONFIGURATION PAYLOAD
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    #[default]
    #[serde(rename = "EPSG:3857")]
    WebMercator,
    #[serde(rename = "EPSG:4326")]
    Wgs84,
}

/// Engine-side map configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub projection: Projection,
    pub interactive: bool,
    /// Always false for a non-interactive map.
    pub show_zoom_controls: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        ConfigurationBuilder::default().build()
    }
}

impl Configuration {
    #[must_use]
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// JSON payload passed to the connector.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ConfigurationBuilder {
    projection: Projection,
    interactive: bool,
    show_zoom_controls: bool,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self { projection: Projection::WebMercator, interactive: true, show_zoom_controls: true }
    }
}

impl ConfigurationBuilder {
    #[must_use]
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    #[must_use]
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    #[must_use]
    pub fn show_zoom_controls(mut self, show: bool) -> Self {
        self.show_zoom_controls = show;
        self
    }

    #[must_use]
    pub fn build(self) -> Configuration {
        Configuration {
            projection: self.projection,
            interactive: self.interactive,
            show_zoom_controls: self.interactive && self.show_zoom_controls,
        }
    }
}

// =============================================================================
// MAP TYPES
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapType {
    #[default]
    Osm,
    StamenWc,
    BingmapsRoad,
    BingmapsAerial,
    Wms,
    Xyz,
}

impl MapType {
    /// Name understood by the connector's `setMapType`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Osm => "OSM",
            Self::StamenWc => "STAMEN_WC",
            Self::BingmapsRoad => "BINGMAPS_ROAD",
            Self::BingmapsAerial => "BINGMAPS_AERIAL",
            Self::Wms => "WMS",
            Self::Xyz => "XYZ",
        }
    }

    #[must_use]
    pub fn is_bing(self) -> bool {
        matches!(self, Self::BingmapsRoad | Self::BingmapsAerial)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MapTypeError {
    #[error("map type {0:?} needs a Bing Maps API key")]
    MissingApiKey(MapType),
    #[error("map type WMS needs WMS parameters with a url")]
    MissingWmsUrl,
    #[error("map type XYZ needs XYZ parameters with a url")]
    MissingXyzUrl,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WmsParam {
    pub key: String,
    pub value: String,
}

/// Web Map Service source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WmsParams {
    pub url: String,
    pub params: Vec<WmsParam>,
}

impl WmsParams {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), params: Vec::new() }
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(WmsParam { key: key.into(), value: value.into() });
        self
    }
}

/// XYZ tile source, rendered to the connector as a JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XyzParams {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,
}

impl XyzParams {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Provider settings that map types depend on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapSources {
    pub bing_maps_api_key: String,
    pub wms: Option<WmsParams>,
    pub xyz: Option<XyzParams>,
}

impl MapSources {
    /// Whether `map_type` can be shown with these settings.
    ///
    /// # Errors
    ///
    /// Returns the [`MapTypeError`] naming the missing credential or url.
    pub fn check(&self, map_type: MapType) -> Result<(), MapTypeError> {
        match map_type {
            t if t.is_bing() && self.bing_maps_api_key.is_empty() => Err(MapTypeError::MissingApiKey(t)),
            MapType::Wms if self.wms.as_ref().is_none_or(|w| w.url.is_empty()) => Err(MapTypeError::MissingWmsUrl),
            MapType::Xyz if self.xyz.as_ref().is_none_or(|x| x.url.is_empty()) => Err(MapTypeError::MissingXyzUrl),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

const DEFAULT_DOCUMENT: &str = "mapview.html";
const DEFAULT_BOOTSTRAP_ATTEMPTS: u32 = 10;
const DEFAULT_BOOTSTRAP_BACKOFF_MS: u64 = 500;

/// Bootstrap tuning, loaded from environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Map document loaded into the rendering surface.
    pub document: String,
    /// Connector acquisition attempts before giving up.
    pub max_attempts: u32,
    /// Sleep between acquisition attempts.
    pub backoff: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            document: DEFAULT_DOCUMENT.to_owned(),
            max_attempts: DEFAULT_BOOTSTRAP_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BOOTSTRAP_BACKOFF_MS),
        }
    }
}

impl BootstrapConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            document: std::env::var("MAPVIEW_DOCUMENT").unwrap_or_else(|_| DEFAULT_DOCUMENT.to_owned()),
            max_attempts: env_parse("MAPVIEW_BOOTSTRAP_ATTEMPTS", DEFAULT_BOOTSTRAP_ATTEMPTS),
            backoff: Duration::from_millis(env_parse("MAPVIEW_BOOTSTRAP_BACKOFF_MS", DEFAULT_BOOTSTRAP_BACKOFF_MS)),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
