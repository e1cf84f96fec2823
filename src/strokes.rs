//! Stroke extraction from ink-on-paper illustrations.

pub mod extract;
pub mod order;
pub mod path;

pub use extract::{ExtractionStats, InkMask, MIN_STROKE_POINTS, extract_paths};
pub use order::order_strokes;
pub use path::{DrawingPath, PathPoint};

use crate::assets::decode::RasterImage;

/// Extract strokes from `image` and return them in reveal order.
pub fn extract_strokes(image: &RasterImage) -> Vec<DrawingPath> {
    order_strokes(extract_paths(image))
}
