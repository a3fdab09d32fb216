//! Object colors.
//!
//! Scene objects carry a plain 8-bit RGBA color used by the display hook and
//! persisted as a packed `0xRRGGBB` integer.

use serde::{Deserialize, Serialize};

/// An 8-bit per channel RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const GRAY: Self = Self::rgb(128, 128, 128);
    /// Link drawn from a child to its parent
    pub const LINK_PARENT: Self = Self::rgb(0, 255, 255);
    /// Link drawn from a parent to its children
    pub const LINK_CHILD: Self = Self::rgb(0, 0, 255);
    pub const SELECTED: Self = Self::rgb(255, 255, 0);
    pub const HIGHLIGHT: Self = Self::rgb(255, 128, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Packs the color channels as `0xRRGGBB`, dropping alpha.
    pub fn to_rgb_u32(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Unpacks a `0xRRGGBB` value into an opaque color.
    pub fn from_rgb_u32(value: u32) -> Self {
        Self::rgb(
            ((value >> 16) & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            (value & 0xff) as u8,
        )
    }

    /// Returns the channels as floats in the 0..=1 range.
    pub fn to_f32_array(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }

    /// Returns a copy with a different alpha.
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Parse a hex color: `#RGB`, `#RRGGBB` or `#RRGGBBAA`, with or without `#`.
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let value = value.trim();
    let hex = value.strip_prefix('#').unwrap_or(value);
    if !hex.is_ascii() {
        return None;
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match hex.len() {
        3 => {
            let r = channel(&hex[0..1].repeat(2))?;
            let g = channel(&hex[1..2].repeat(2))?;
            let b = channel(&hex[2..3].repeat(2))?;
            Some(Color::rgb(r, g, b))
        }
        6 => Some(Color::rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        8 => Some(Color::rgba(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        )),
        _ => None,
    }
}
