//! Pen color parsing.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

use image::Rgba;

/// Default pen color.
pub const DEFAULT_PEN_HEX: &str = "#000000";

/// Parse `#RGB` or `#RRGGBB` values into RGB channels.
#[must_use]
pub fn parse_hex_rgb(raw: &str) -> Option<(u8, u8, u8)> {
    let hex = raw.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => Some((hex_byte(&hex[0..1].repeat(2))?, hex_byte(&hex[1..2].repeat(2))?, hex_byte(&hex[2..3].repeat(2))?)),
        6 => Some((hex_byte(&hex[0..2])?, hex_byte(&hex[2..4])?, hex_byte(&hex[4..6])?)),
        _ => None,
    }
}

fn hex_byte(digits: &str) -> Option<u8> {
    match u8::from_str_radix(digits, 16) {
        Ok(value) => Some(value),
        Err(_) => None,
    }
}

/// The current stroke color. Always opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenColor {
    r: u8,
    g: u8,
    b: u8,
}

impl PenColor {
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a hex color string; `None` when it is not `#RGB` / `#RRGGBB`.
    #[must_use]
    pub fn from_hex(raw: &str) -> Option<Self> {
        parse_hex_rgb(raw).map(|(r, g, b)| Self::new(r, g, b))
    }

    /// Canonical lowercase `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    #[must_use]
    pub fn rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl Default for PenColor {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}
