use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba8Premul;

/// Opaque-or-translucent color written as a CSS hex string (`#rgb`, `#rrggbb`, `#rrggbbaa`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    pub const BLACK: HexColor = HexColor::rgb(0, 0, 0);
    pub const WHITE: HexColor = HexColor::rgb(255, 255, 255);
    /// Near-black used for header glyphs, pen tip and underline.
    pub const INK: HexColor = HexColor::rgb(0x11, 0x11, 0x11);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_rgba8_premul(self) -> Rgba8Premul {
        Rgba8Premul::from_straight_rgba(self.r, self.g, self.b, self.a)
    }

    /// `0xRRGGBB` form understood by ffmpeg filters.
    pub fn to_ffmpeg(self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_css(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl std::str::FromStr for HexColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex(s)
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse_hex(&s)
    }
}

impl From<HexColor> for String {
    fn from(c: HexColor) -> Self {
        c.to_css()
    }
}

fn parse_hex(s: &str) -> Result<HexColor, String> {
    let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex color '{s}'"));
    }

    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);

    let parsed = match hex.len() {
        3 => (nibble(0), nibble(1), nibble(2), Ok(255)),
        6 => (byte(0), byte(2), byte(4), Ok(255)),
        8 => (byte(0), byte(2), byte(4), byte(6)),
        _ => return Err(format!("hex color '{s}' must have 3, 6 or 8 digits")),
    };
    match parsed {
        (Ok(r), Ok(g), Ok(b), Ok(a)) => Ok(HexColor { r, g, b, a }),
        _ => Err(format!("invalid hex color '{s}'")),
    }
}
