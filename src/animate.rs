//! Whiteboard animation: header write-on followed by progressive stroke reveal.

pub mod header;
pub(crate) mod raster;
pub mod reveal;

pub use header::{
    DEFAULT_HEADER_SECONDS, DrawingPlacement, HeaderAnimator, HeaderLayout, HeaderTiming,
    header_from_narration,
};
pub use raster::FrameRGBA;
pub use reveal::{AnimationSpec, FrameRenderer, RevealSchedule, RevealStyle, StrokeStyle};

use crate::assets::decode::RasterImage;
use crate::assets::glyphs::GlyphRasterizer;
use crate::foundation::error::SketchResult;

/// Extract strokes from a canvas-sized illustration and set up its renderer.
///
/// An image without ink is not an error: the renderer then shows only the header (and, in
/// color-mask style, the illustration once the header is done).
pub fn prepare_animation(
    spec: AnimationSpec,
    image: &RasterImage,
    title: &str,
    header_seconds: f64,
    rasterizer: &GlyphRasterizer,
) -> SketchResult<FrameRenderer> {
    let paths = crate::strokes::extract_strokes(image);
    let timing = HeaderTiming::for_clip(spec.duration_secs, spec.fps, header_seconds);
    let header = HeaderAnimator::new(title, spec.canvas, timing, rasterizer)?;
    FrameRenderer::new(spec, image, paths, header)
}
