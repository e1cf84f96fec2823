use crate::assets::decode::RasterImage;
use crate::foundation::math::luma_601;
use crate::strokes::path::{DrawingPath, PathPoint};

/// Pixels darker than this (Rec.601 luma, flattened over white) count as ink.
pub const INK_LUMA_THRESHOLD: u8 = 128;

/// Connected ink components with fewer points are dropped as noise.
pub const MIN_STROKE_POINTS: usize = 6;

/// Per-pixel ink classification of a raster.
#[derive(Clone, Debug)]
pub struct InkMask {
    width: u32,
    height: u32,
    ink: Vec<bool>,
}

impl InkMask {
    pub fn from_raster(image: &RasterImage) -> Self {
        let ink = image
            .rgba8_premul
            .chunks_exact(4)
            .map(|px| {
                // Premultiplied over opaque white: c + (255 - a).
                let bg = 255 - px[3];
                let r = px[0].saturating_add(bg);
                let g = px[1].saturating_add(bg);
                let b = px[2].saturating_add(bg);
                luma_601(r, g, b) < INK_LUMA_THRESHOLD
            })
            .collect();
        Self {
            width: image.width,
            height: image.height,
            ink,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.ink[self.index(x, y)]
    }

    pub fn ink_pixels(&self) -> usize {
        self.ink.iter().filter(|&&b| b).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Counters reported by [`extract_paths_with_stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub ink_pixels: usize,
    pub components: usize,
    pub kept: usize,
    pub discarded: usize,
}

/// Trace every 8-connected ink component of `image` into a [`DrawingPath`].
///
/// Paths come back in seed discovery order (row-major scan); use
/// [`order_strokes`](crate::strokes::order::order_strokes) for reveal order.
pub fn extract_paths(image: &RasterImage) -> Vec<DrawingPath> {
    extract_paths_with_stats(image).0
}

#[tracing::instrument(level = "debug", skip_all, fields(width = image.width, height = image.height))]
pub fn extract_paths_with_stats(image: &RasterImage) -> (Vec<DrawingPath>, ExtractionStats) {
    let mask = InkMask::from_raster(image);
    let mut stats = ExtractionStats {
        ink_pixels: mask.ink_pixels(),
        ..ExtractionStats::default()
    };

    let mut visited = vec![false; mask.ink.len()];
    let mut stack = Vec::new();
    let mut paths = Vec::new();

    for y in 0..mask.height {
        for x in 0..mask.width {
            let idx = mask.index(x, y);
            if !mask.ink[idx] || visited[idx] {
                continue;
            }
            let points = trace_component(&mask, &mut visited, &mut stack, PathPoint::new(x, y));
            stats.components += 1;
            if points.len() < MIN_STROKE_POINTS {
                stats.discarded += 1;
                continue;
            }
            match DrawingPath::new(points) {
                Ok(path) => {
                    stats.kept += 1;
                    paths.push(path);
                }
                Err(_) => stats.discarded += 1,
            }
        }
    }

    if paths.is_empty() {
        tracing::debug!(ink_pixels = stats.ink_pixels, "no strokes extracted");
    } else {
        tracing::debug!(
            kept = stats.kept,
            discarded = stats.discarded,
            ink_pixels = stats.ink_pixels,
            "strokes extracted"
        );
    }
    (paths, stats)
}

/// Depth-first trace from `seed`. Pixels are marked visited when pushed, so the stack never
/// holds more than `width * height` entries and every pixel is visited once.
fn trace_component(
    mask: &InkMask,
    visited: &mut [bool],
    stack: &mut Vec<PathPoint>,
    seed: PathPoint,
) -> Vec<PathPoint> {
    let mut points = Vec::new();
    stack.clear();
    visited[mask.index(seed.x, seed.y)] = true;
    stack.push(seed);

    while let Some(p) = stack.pop() {
        points.push(p);
        for dx in -1i64..=1 {
            for dy in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = i64::from(p.x) + dx;
                let ny = i64::from(p.y) + dy;
                if nx < 0 || ny < 0 || nx >= i64::from(mask.width) || ny >= i64::from(mask.height)
                {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                let idx = mask.index(nx, ny);
                if mask.ink[idx] && !visited[idx] {
                    visited[idx] = true;
                    stack.push(PathPoint::new(nx, ny));
                }
            }
        }
    }
    points
}

#[cfg(test)]
#[path = "../../tests/unit/strokes/extract.rs"]
mod tests;
