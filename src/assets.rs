//! Scene media decoding, colors and header glyph rasterization.

pub mod color;
pub mod decode;
pub mod glyphs;

pub use color::HexColor;
pub use decode::{RasterImage, decode_image, decode_image_to_canvas, encode_png};
pub use glyphs::{GlyphBuffer, GlyphRasterizer};
