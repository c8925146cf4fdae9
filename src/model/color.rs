//! Stroke/fill color with opacity.

use super::ModelError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// `0.0..=1.0`
    pub opacity: f64,
}

impl Color {
    pub const RED: Self = Self::rgb(0xFF, 0x00, 0x00);
    pub const LIME_GREEN: Self = Self::rgb(0x32, 0xCD, 0x32);
    pub const DARK_ORANGE: Self = Self::rgb(0xFF, 0x8C, 0x00);

    #[must_use]
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue, opacity: 1.0 }
    }

    /// Parse `#rrggbb` (leading `#` optional) with the given opacity.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArgument`] for anything that is not six hex
    /// digits or an opacity outside `0..=1`.
    pub fn web(hex: &str, opacity: f64) -> Result<Self, ModelError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ModelError::InvalidArgument(format!("invalid web color: {hex}")));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| ModelError::InvalidArgument(format!("invalid web color: {hex}")))
        };
        Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?).with_opacity(opacity)
    }

    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArgument`] for an opacity outside `0..=1`.
    pub fn with_opacity(self, opacity: f64) -> Result<Self, ModelError> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(ModelError::InvalidArgument(format!("opacity out of range: {opacity}")));
        }
        Ok(Self { opacity, ..self })
    }

    pub(crate) fn rgba(self) -> protocol::Rgba {
        protocol::Rgba { red: self.red, green: self.green, blue: self.blue, alpha: self.opacity }
    }

    pub(crate) const fn translucent(self, opacity: f64) -> Self {
        Self { opacity, ..self }
    }
}

#[cfg(test)]
#[path = "color_test.rs"]
mod tests;
