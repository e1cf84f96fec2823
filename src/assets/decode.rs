use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::core::Canvas;
use crate::foundation::error::{SketchError, SketchResult};

/// Decoded raster illustration in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl RasterImage {
    /// Build a raster from straight-alpha RGBA8 bytes.
    pub fn from_straight_rgba8(width: u32, height: u32, mut rgba: Vec<u8>) -> SketchResult<Self> {
        if width == 0 || height == 0 {
            return Err(SketchError::input("image has zero width or height"));
        }
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(SketchError::input(format!(
                "image byte length {} does not match {width}x{height} rgba8",
                rgba.len()
            )));
        }
        premultiply_rgba8_in_place(&mut rgba);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba),
        })
    }

    /// Canvas with this image's dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

/// Decode encoded image bytes (PNG, JPEG, WebP, ...) into premultiplied RGBA8.
///
/// Empty and undecodable buffers are rejected as input errors; truncated files surface here
/// rather than as a malformed clip later on.
pub fn decode_image(bytes: &[u8]) -> SketchResult<RasterImage> {
    if bytes.is_empty() {
        return Err(SketchError::input("image bytes are empty"));
    }
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| SketchError::input(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    RasterImage::from_straight_rgba8(width, height, rgba.into_raw())
}

/// Decode `bytes` and resample to exactly `canvas` (stretching, like drawing the illustration
/// into a canvas-sized rect).
pub fn decode_image_to_canvas(bytes: &[u8], canvas: Canvas) -> SketchResult<RasterImage> {
    if bytes.is_empty() {
        return Err(SketchError::input("image bytes are empty"));
    }
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| SketchError::input(format!("decode image from memory: {e}")))?;
    let mut rgba = dyn_img.to_rgba8();
    if rgba.dimensions() != (canvas.width, canvas.height) {
        rgba = image::imageops::resize(
            &rgba,
            canvas.width,
            canvas.height,
            image::imageops::FilterType::Triangle,
        );
    }
    RasterImage::from_straight_rgba8(canvas.width, canvas.height, rgba.into_raw())
}

/// Encode premultiplied RGBA8 as PNG bytes (unpremultiplying first).
pub fn encode_png(width: u32, height: u32, rgba8_premul: &[u8]) -> SketchResult<Vec<u8>> {
    let mut straight = rgba8_premul.to_vec();
    unpremultiply_rgba8_in_place(&mut straight);
    let img = image::RgbaImage::from_raw(width, height, straight)
        .ok_or_else(|| SketchError::render("png buffer size does not match dimensions"))?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(out)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
