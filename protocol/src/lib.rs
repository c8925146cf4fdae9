//! Typed call surface between the host map view and the engine-side connector.
//!
//! This crate owns the representation used in both directions. Host → engine
//! calls are [`Command`] values; every command renders to the connector
//! function name plus positional JSON arguments, which is what the engine's
//! scripting bridge ultimately invokes. Engine → host callbacks arrive as
//! `{"callback": "<name>", "args": [...]}` and decode into [`Callback`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Error returned by [`decode_callback`] and [`parse_callback`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw text is not a JSON callback envelope.
    #[error("failed to decode callback: {0}")]
    Decode(#[from] serde_json::Error),
    /// The callback name is not part of the connector surface.
    #[error("unknown callback: {0}")]
    UnknownCallback(String),
    /// A positional argument is absent.
    #[error("callback {callback} is missing argument {index}")]
    MissingArgument { callback: String, index: usize },
    /// A positional argument has the wrong JSON type.
    #[error("callback {callback} argument {index} has the wrong type")]
    InvalidArgument { callback: String, index: usize },
}

// =============================================================================
// SHARED VALUES
// =============================================================================

/// Color as passed to the connector: 8-bit channels and an alpha in `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f64,
}

/// Axis-aligned lat/lon box in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

impl Bounds {
    fn args(&self) -> [Value; 4] {
        [
            json!(self.min_latitude),
            json!(self.min_longitude),
            json!(self.max_latitude),
            json!(self.max_longitude),
        ]
    }
}

// =============================================================================
// HOST → ENGINE
// =============================================================================

/// A single call into the engine connector.
///
/// Object-targeted commands carry the entity id; the connector resolves the
/// mirror object by that id.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Create a marker mirror with its image.
    AddMarker { id: String, url: String, latitude: f64, longitude: f64, offset_x: i32, offset_y: i32 },
    /// Create a label mirror.
    AddLabel {
        id: String,
        text: String,
        css_class: String,
        latitude: f64,
        longitude: f64,
        offset_x: i32,
        offset_y: i32,
    },
    /// Move a marker or label mirror.
    MoveMapObject { id: String, latitude: f64, longitude: f64 },
    SetCssClass { id: String, css_class: String },
    /// Rotation in degrees, already normalized to `0..360`.
    SetRotation { id: String, rotation: i32 },
    /// Start building a coordinate line mirror.
    GetCoordinateLine { id: String },
    AddCoordinate { id: String, latitude: f64, longitude: f64 },
    /// Start building a circle mirror.
    GetMapCircle { id: String },
    SetCircleCenter { id: String, latitude: f64, longitude: f64 },
    SetRadius { id: String, radius: f64 },
    SetColor { id: String, color: Rgba },
    SetFillColor { id: String, color: Rgba },
    SetWidth { id: String, width: u32 },
    SetClosed { id: String, closed: bool },
    /// Finish building a line or circle mirror; its definition is frozen.
    Seal { id: String },
    Show { id: String },
    Hide { id: String },
    /// Drop a mirror of any kind.
    Remove { id: String },
    SetCenter { latitude: f64, longitude: f64, animation_ms: u32 },
    SetZoom { zoom: f64, animation_ms: u32 },
    SetMapType { name: String },
    SetBingMapsApiKey { key: String },
    SetWmsParamsUrl { url: String },
    ClearWmsParamsParams,
    AddWmsParamsParam { key: String, value: String },
    /// XYZ source options as a JSON object string.
    SetXyzParams { json: String },
    SetExtent { bounds: Bounds, animation_ms: u32 },
    ConstrainExtent { bounds: Bounds },
    ClearConstrainExtent,
}

impl Command {
    /// Connector function name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddMarker { .. } => "addMarker",
            Self::AddLabel { .. } => "addLabel",
            Self::MoveMapObject { .. } => "moveMapObject",
            Self::SetCssClass { .. } => "setCssClass",
            Self::SetRotation { .. } => "setRotation",
            Self::GetCoordinateLine { .. } => "getCoordinateLine",
            Self::AddCoordinate { .. } => "addCoordinate",
            Self::GetMapCircle { .. } => "getMapCircle",
            Self::SetCircleCenter { .. } => "setCircleCenter",
            Self::SetRadius { .. } => "setRadius",
            Self::SetColor { .. } => "setColor",
            Self::SetFillColor { .. } => "setFillColor",
            Self::SetWidth { .. } => "setWidth",
            Self::SetClosed { .. } => "setClosed",
            Self::Seal { .. } => "seal",
            Self::Show { .. } => "show",
            Self::Hide { .. } => "hide",
            Self::Remove { .. } => "remove",
            Self::SetCenter { .. } => "setCenter",
            Self::SetZoom { .. } => "setZoom",
            Self::SetMapType { .. } => "setMapType",
            Self::SetBingMapsApiKey { .. } => "setBingMapsApiKey",
            Self::SetWmsParamsUrl { .. } => "setWMSParamsUrl",
            Self::ClearWmsParamsParams => "clearWMSParamsParams",
            Self::AddWmsParamsParam { .. } => "addWMSParamsParams",
            Self::SetXyzParams { .. } => "setXYZParams",
            Self::SetExtent { .. } => "setExtent",
            Self::ConstrainExtent { .. } => "constrainExtent",
            Self::ClearConstrainExtent => "clearConstrainExtent",
        }
    }

    /// Id of the mirror object this command addresses, if any.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::AddMarker { id, .. }
            | Self::AddLabel { id, .. }
            | Self::MoveMapObject { id, .. }
            | Self::SetCssClass { id, .. }
            | Self::SetRotation { id, .. }
            | Self::GetCoordinateLine { id }
            | Self::AddCoordinate { id, .. }
            | Self::GetMapCircle { id }
            | Self::SetCircleCenter { id, .. }
            | Self::SetRadius { id, .. }
            | Self::SetColor { id, .. }
            | Self::SetFillColor { id, .. }
            | Self::SetWidth { id, .. }
            | Self::SetClosed { id, .. }
            | Self::Seal { id }
            | Self::Show { id }
            | Self::Hide { id }
            | Self::Remove { id } => Some(id),
            _ => None,
        }
    }

    /// Positional arguments in connector order.
    #[must_use]
    pub fn args(&self) -> Vec<Value> {
        match self {
            Self::AddMarker { id, url, latitude, longitude, offset_x, offset_y } => {
                vec![json!(id), json!(url), json!(latitude), json!(longitude), json!(offset_x), json!(offset_y)]
            }
            Self::AddLabel { id, text, css_class, latitude, longitude, offset_x, offset_y } => vec![
                json!(id),
                json!(text),
                json!(css_class),
                json!(latitude),
                json!(longitude),
                json!(offset_x),
                json!(offset_y),
            ],
            Self::MoveMapObject { id, latitude, longitude }
            | Self::AddCoordinate { id, latitude, longitude }
            | Self::SetCircleCenter { id, latitude, longitude } => vec![json!(id), json!(latitude), json!(longitude)],
            Self::SetCssClass { id, css_class } => vec![json!(id), json!(css_class)],
            Self::SetRotation { id, rotation } => vec![json!(id), json!(rotation)],
            Self::SetRadius { id, radius } => vec![json!(id), json!(radius)],
            Self::SetColor { id, color } | Self::SetFillColor { id, color } => {
                vec![json!(id), json!(color.red), json!(color.green), json!(color.blue), json!(color.alpha)]
            }
            Self::SetWidth { id, width } => vec![json!(id), json!(width)],
            Self::SetClosed { id, closed } => vec![json!(id), json!(closed)],
            Self::GetCoordinateLine { id }
            | Self::GetMapCircle { id }
            | Self::Seal { id }
            | Self::Show { id }
            | Self::Hide { id }
            | Self::Remove { id } => vec![json!(id)],
            Self::SetCenter { latitude, longitude, animation_ms } => {
                vec![json!(latitude), json!(longitude), json!(animation_ms)]
            }
            Self::SetZoom { zoom, animation_ms } => vec![json!(zoom), json!(animation_ms)],
            Self::SetMapType { name } => vec![json!(name)],
            Self::SetBingMapsApiKey { key } => vec![json!(key)],
            Self::SetWmsParamsUrl { url } => vec![json!(url)],
            Self::AddWmsParamsParam { key, value } => vec![json!(key), json!(value)],
            Self::SetXyzParams { json } => vec![json!(json)],
            Self::SetExtent { bounds, animation_ms } => {
                let mut args = bounds.args().to_vec();
                args.push(json!(animation_ms));
                args
            }
            Self::ConstrainExtent { bounds } => bounds.args().to_vec(),
            Self::ClearWmsParamsParams | Self::ClearConstrainExtent => Vec::new(),
        }
    }
}

/// Render a command as `{"op": name, "args": [...]}`.
#[must_use]
pub fn encode_command(command: &Command) -> String {
    json!({ "op": command.name(), "args": command.args() }).to_string()
}

// =============================================================================
// ENGINE → HOST
// =============================================================================

/// Kind of pointer interaction on a marker or label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Clicked,
    DoubleClicked,
    RightClicked,
    MouseDown,
    MouseUp,
    Entered,
    Exited,
}

impl Interaction {
    pub const ALL: [Self; 7] = [
        Self::Clicked,
        Self::DoubleClicked,
        Self::RightClicked,
        Self::MouseDown,
        Self::MouseUp,
        Self::Entered,
        Self::Exited,
    ];

    /// Callback name suffix, e.g. `markerDoubleClicked` → `DoubleClicked`.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Clicked => "Clicked",
            Self::DoubleClicked => "DoubleClicked",
            Self::RightClicked => "RightClicked",
            Self::MouseDown => "MouseDown",
            Self::MouseUp => "MouseUp",
            Self::Entered => "Entered",
            Self::Exited => "Exited",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.suffix() == suffix)
    }
}

/// A raw event reported by the engine connector.
#[derive(Clone, Debug, PartialEq)]
pub enum Callback {
    CenterMovedTo { latitude: f64, longitude: f64 },
    PointerMovedTo { latitude: f64, longitude: f64 },
    SingleClickAt { latitude: f64, longitude: f64 },
    ContextClickAt { latitude: f64, longitude: f64 },
    ZoomChanged { zoom: f64 },
    ExtentSelected(Bounds),
    ExtentChanged(Bounds),
    Marker { id: String, interaction: Interaction },
    Label { id: String, interaction: Interaction },
    Debug(String),
    Console(String),
    ShowLink(String),
}

impl Callback {
    /// Connector callback name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::CenterMovedTo { .. } => "centerMovedTo".into(),
            Self::PointerMovedTo { .. } => "pointerMovedTo".into(),
            Self::SingleClickAt { .. } => "singleClickAt".into(),
            Self::ContextClickAt { .. } => "contextClickAt".into(),
            Self::ZoomChanged { .. } => "zoomChanged".into(),
            Self::ExtentSelected(_) => "extentSelected".into(),
            Self::ExtentChanged(_) => "extentChanged".into(),
            Self::Marker { interaction, .. } => format!("marker{}", interaction.suffix()),
            Self::Label { interaction, .. } => format!("label{}", interaction.suffix()),
            Self::Debug(_) => "debug".into(),
            Self::Console(_) => "console".into(),
            Self::ShowLink(_) => "showLink".into(),
        }
    }

    /// Positional arguments in connector order.
    #[must_use]
    pub fn args(&self) -> Vec<Value> {
        match self {
            Self::CenterMovedTo { latitude, longitude }
            | Self::PointerMovedTo { latitude, longitude }
            | Self::SingleClickAt { latitude, longitude }
            | Self::ContextClickAt { latitude, longitude } => vec![json!(latitude), json!(longitude)],
            Self::ZoomChanged { zoom } => vec![json!(zoom)],
            Self::ExtentSelected(bounds) | Self::ExtentChanged(bounds) => bounds.args().to_vec(),
            Self::Marker { id, .. } | Self::Label { id, .. } => vec![json!(id)],
            Self::Debug(text) | Self::Console(text) | Self::ShowLink(text) => vec![json!(text)],
        }
    }
}

#[derive(Deserialize)]
struct WireCallback {
    callback: String,
    #[serde(default)]
    args: Vec<Value>,
}

/// Render a callback as `{"callback": name, "args": [...]}`.
#[must_use]
pub fn encode_callback(callback: &Callback) -> String {
    json!({ "callback": callback.name(), "args": callback.args() }).to_string()
}

/// Decode a JSON callback envelope.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON and the
/// [`parse_callback`] errors for unknown names or bad arguments.
pub fn decode_callback(text: &str) -> Result<Callback, CodecError> {
    let wire: WireCallback = serde_json::from_str(text)?;
    parse_callback(&wire.callback, &wire.args)
}

/// Build a callback from its name and positional arguments.
///
/// # Errors
///
/// Returns [`CodecError::UnknownCallback`] for names outside the connector
/// surface, [`CodecError::MissingArgument`] / [`CodecError::InvalidArgument`]
/// when a positional argument is absent or mistyped.
pub fn parse_callback(name: &str, args: &[Value]) -> Result<Callback, CodecError> {
    let args = Args { callback: name, values: args };
    match name {
        "centerMovedTo" => Ok(Callback::CenterMovedTo { latitude: args.number(0)?, longitude: args.number(1)? }),
        "pointerMovedTo" => Ok(Callback::PointerMovedTo { latitude: args.number(0)?, longitude: args.number(1)? }),
        "singleClickAt" => Ok(Callback::SingleClickAt { latitude: args.number(0)?, longitude: args.number(1)? }),
        "contextClickAt" => Ok(Callback::ContextClickAt { latitude: args.number(0)?, longitude: args.number(1)? }),
        "zoomChanged" => Ok(Callback::ZoomChanged { zoom: args.number(0)? }),
        "extentSelected" => Ok(Callback::ExtentSelected(args.bounds()?)),
        "extentChanged" => Ok(Callback::ExtentChanged(args.bounds()?)),
        "debug" => Ok(Callback::Debug(args.text(0)?)),
        "console" => Ok(Callback::Console(args.text(0)?)),
        "showLink" => Ok(Callback::ShowLink(args.text(0)?)),
        other => {
            if let Some(interaction) = other
                .strip_prefix("marker")
                .and_then(Interaction::from_suffix)
            {
                return Ok(Callback::Marker { id: args.text(0)?, interaction });
            }
            if let Some(interaction) = other
                .strip_prefix("label")
                .and_then(Interaction::from_suffix)
            {
                return Ok(Callback::Label { id: args.text(0)?, interaction });
            }
            Err(CodecError::UnknownCallback(other.to_owned()))
        }
    }
}

struct Args<'a> {
    callback: &'a str,
    values: &'a [Value],
}

impl Args<'_> {
    fn get(&self, index: usize) -> Result<&Value, CodecError> {
        self.values
            .get(index)
            .ok_or_else(|| CodecError::MissingArgument { callback: self.callback.to_owned(), index })
    }

    fn number(&self, index: usize) -> Result<f64, CodecError> {
        self.get(index)?
            .as_f64()
            .ok_or_else(|| CodecError::InvalidArgument { callback: self.callback.to_owned(), index })
    }

    fn text(&self, index: usize) -> Result<String, CodecError> {
        self.get(index)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| CodecError::InvalidArgument { callback: self.callback.to_owned(), index })
    }

    fn bounds(&self) -> Result<Bounds, CodecError> {
        Ok(Bounds {
            min_latitude: self.number(0)?,
            min_longitude: self.number(1)?,
            max_latitude: self.number(2)?,
            max_longitude: self.number(3)?,
        })
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
