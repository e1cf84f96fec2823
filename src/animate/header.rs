//! Title write-on shown before the stroke reveal starts.
//!
//! The header text is rasterized once; each frame blits a left-to-right growing slice of it with a
//! pen tip at the reveal edge, then draws a wavy underline once the title is complete.

use kurbo::Shape as _;

use crate::animate::raster::{
    FrameRGBA, bezpath_to_cpu, over_in_place, over_region, paint_color, paint_layer,
};
use crate::assets::color::HexColor;
use crate::assets::glyphs::{GlyphBuffer, GlyphRasterizer};
use crate::foundation::core::{Affine, BezPath, Canvas, Fps, Point};
use crate::foundation::error::SketchResult;

/// Default header write-on length.
pub const DEFAULT_HEADER_SECONDS: f64 = 3.0;

const TITLE_PHASE_SHARE: f64 = 0.7;
const UNDERLINE_POINTS: usize = 23;
const UNDERLINE_WIDTH: f64 = 3.0;
const MIN_FONT_PX: u32 = 16;
const MAX_DERIVED_HEADER_CHARS: usize = 40;
const DERIVED_HEADER_WORDS: usize = 5;

/// Frame budget of the header and its two phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderTiming {
    pub total: u64,
    pub title: u64,
    pub underline: u64,
}

impl HeaderTiming {
    /// No header: the stroke reveal starts on frame 0.
    pub const NONE: HeaderTiming = HeaderTiming {
        total: 0,
        title: 0,
        underline: 0,
    };

    /// Header window for a clip of `duration_secs`: `header_seconds` long, but always leaving at
    /// least one frame for the drawing.
    pub fn for_clip(duration_secs: f64, fps: Fps, header_seconds: f64) -> Self {
        let clip_frames = fps.secs_to_frames_floor(duration_secs) as i64;
        let cap = (fps.as_f64() * header_seconds.max(0.0)).floor() as i64;
        let total = (clip_frames - 1).max(1).min(cap).max(0) as u64;
        if total == 0 {
            return Self::NONE;
        }
        let title = ((total as f64 * TITLE_PHASE_SHARE).floor() as u64).max(1);
        let underline = total.saturating_sub(title).max(1);
        Self {
            total,
            title,
            underline,
        }
    }

    /// Fraction of the title revealed at `frame`.
    pub fn title_progress(&self, frame: u64) -> f64 {
        if self.title == 0 {
            return 1.0;
        }
        let f = frame.min(self.total);
        if f <= self.title {
            f as f64 / self.title as f64
        } else {
            1.0
        }
    }

    /// Number of underline points stroked at `frame` (0 until the title is written).
    pub fn underline_points(&self, frame: u64) -> usize {
        if self.title == 0 || frame <= self.title {
            return 0;
        }
        let uf = (frame - self.title).min(self.underline);
        let p = (uf as f64 / self.underline as f64).clamp(0.0, 1.0);
        ((UNDERLINE_POINTS as f64 * p).floor() as usize).max(1)
    }
}

/// Affine placement of the drawing below the header.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawingPlacement {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl DrawingPlacement {
    pub const IDENTITY: DrawingPlacement = DrawingPlacement {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    pub fn transform(&self) -> Affine {
        Affine::translate((self.offset_x, self.offset_y)) * Affine::scale(self.scale)
    }
}

/// Pixel geometry of the header for one canvas and font size.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderLayout {
    pub pad_x: u32,
    pub pad_y: u32,
    pub font_px: u32,
    pub text_width: f64,
    pub underline_y: f64,
    pub reserved_top: u32,
    pub bottom_pad: u32,
}

impl HeaderLayout {
    pub fn base_font_px(canvas: Canvas) -> u32 {
        (f64::from(canvas.height) * 0.055).floor() as u32
    }

    pub fn usable_width(canvas: Canvas) -> f64 {
        let pad_x = (f64::from(canvas.width) * 0.03).floor();
        (f64::from(canvas.width) - 2.0 * pad_x).max(50.0)
    }

    pub fn new(canvas: Canvas, font_px: u32, text_width: f64) -> Self {
        let pad_x = (f64::from(canvas.width) * 0.03).floor() as u32;
        let pad_y = (f64::from(canvas.height) * 0.06).floor() as u32;
        let size = f64::from(font_px);
        let underline_y = f64::from(pad_y) + size + (size * 0.2).floor().max(6.0);
        let reserved_top = (underline_y + (size * 0.4).floor().max(12.0)) as u32;
        let bottom_pad = (f64::from(canvas.height) * 0.05).floor() as u32;
        Self {
            pad_x,
            pad_y,
            font_px,
            text_width,
            underline_y,
            reserved_top,
            bottom_pad,
        }
    }

    /// Uniform scale and offset that fit the drawing between the header and the bottom margin.
    pub fn placement(&self, canvas: Canvas) -> DrawingPlacement {
        let h = f64::from(canvas.height);
        let w = f64::from(canvas.width);
        let scale = ((h - f64::from(self.reserved_top) - f64::from(self.bottom_pad)) / h)
            .clamp(0.0, 1.0);
        DrawingPlacement {
            scale,
            offset_x: ((w - (w * scale).floor()) / 2.0).round(),
            offset_y: f64::from(self.reserved_top),
        }
    }

    /// Underline polyline with a slight sinusoidal wobble.
    pub fn underline_points(&self) -> Vec<Point> {
        let wobble = (f64::from(self.font_px) * 0.02).max(0.8);
        let segments = (UNDERLINE_POINTS - 1) as f64;
        (0..UNDERLINE_POINTS)
            .map(|i| {
                let s = i as f64 / segments;
                Point::new(
                    f64::from(self.pad_x) + self.text_width * s,
                    self.underline_y + (i as f64 * 1.3).sin() * wobble * 0.5,
                )
            })
            .collect()
    }

    /// Pen tip centre and radius when `revealed_px` columns of the title are visible.
    pub fn pen_tip(&self, revealed_px: u32) -> (Point, f64) {
        let size = f64::from(self.font_px);
        let lift = (size * 0.35).floor().clamp(12.0, 20.0);
        let centre = Point::new(
            f64::from(self.pad_x + revealed_px),
            f64::from(self.pad_y) + size - lift,
        );
        (centre, (size * 0.08).floor().max(3.0))
    }
}

/// Renders the header layer for any frame of one clip.
#[derive(Clone, Debug)]
pub struct HeaderAnimator {
    canvas: Canvas,
    timing: HeaderTiming,
    layout: Option<HeaderLayout>,
    glyphs: Option<GlyphBuffer>,
    underline: Vec<Point>,
}

impl HeaderAnimator {
    /// Animator that draws nothing and reserves no space.
    pub fn empty(canvas: Canvas) -> Self {
        Self {
            canvas,
            timing: HeaderTiming::NONE,
            layout: None,
            glyphs: None,
            underline: Vec::new(),
        }
    }

    /// Fit and rasterize `title`. A blank title yields [`HeaderAnimator::empty`].
    pub fn new(
        title: &str,
        canvas: Canvas,
        timing: HeaderTiming,
        rasterizer: &GlyphRasterizer,
    ) -> SketchResult<Self> {
        let title = title.trim();
        if title.is_empty() || timing.total == 0 {
            return Ok(Self::empty(canvas));
        }

        let (font_px, measured) = rasterizer.fit(
            title,
            HeaderLayout::base_font_px(canvas),
            HeaderLayout::usable_width(canvas),
            MIN_FONT_PX,
        )?;
        let text_width = measured.ceil();
        let glyphs = rasterizer.rasterize(title, font_px, text_width)?;
        let layout = HeaderLayout::new(canvas, font_px, text_width);
        tracing::debug!(font_px, text_width, frames = timing.total, "header laid out");

        Ok(Self {
            canvas,
            timing,
            underline: layout.underline_points(),
            layout: Some(layout),
            glyphs: Some(glyphs),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_none()
    }

    pub fn frame_count(&self) -> u64 {
        self.timing.total
    }

    pub fn timing(&self) -> HeaderTiming {
        self.timing
    }

    pub fn layout(&self) -> Option<&HeaderLayout> {
        self.layout.as_ref()
    }

    pub fn placement(&self) -> DrawingPlacement {
        self.layout
            .as_ref()
            .map(|l| l.placement(self.canvas))
            .unwrap_or(DrawingPlacement::IDENTITY)
    }

    /// Composite the header state of `frame` over `target`.
    pub fn draw(&self, frame: u64, target: &mut FrameRGBA) -> SketchResult<()> {
        let (Some(layout), Some(glyphs)) = (self.layout.as_ref(), self.glyphs.as_ref()) else {
            return Ok(());
        };

        let revealed =
            (layout.text_width * self.timing.title_progress(frame)).floor().max(0.0) as u32;
        if revealed > 0 {
            over_region(
                target,
                &glyphs.rgba8_premul,
                glyphs.width,
                glyphs.height,
                revealed,
                layout.pad_x,
                layout.pad_y,
            );
        }

        let show_tip = f64::from(revealed) < layout.text_width;
        let underline_count = self.timing.underline_points(frame).min(self.underline.len());
        if !show_tip && underline_count < 2 {
            return Ok(());
        }

        let ink = paint_color(HexColor::INK.to_rgba8_premul());
        let layer = paint_layer(self.canvas, |ctx| {
            ctx.set_paint(ink);
            if show_tip {
                let (centre, radius) = layout.pen_tip(revealed);
                let tip = kurbo::Circle::new(centre, radius).to_path(0.1);
                ctx.fill_path(&bezpath_to_cpu(&tip));
            }
            if underline_count >= 2 {
                let mut path = BezPath::new();
                path.move_to(self.underline[0]);
                for p in &self.underline[1..underline_count] {
                    path.line_to(*p);
                }
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(UNDERLINE_WIDTH));
                ctx.stroke_path(&bezpath_to_cpu(&path));
            }
            Ok(())
        })?;
        over_in_place(&mut target.data, &layer);
        Ok(())
    }
}

/// Derive a short header from narration text: the first sentence with punctuation stripped,
/// cut to its first five words when longer than 40 characters.
pub fn header_from_narration(narration: &str) -> String {
    let Some(first) = narration
        .split(['.', '!', '?'])
        .map(str::trim)
        .find(|s| !s.is_empty())
    else {
        return "Topic".to_owned();
    };

    let cleaned: String = first
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let header = words.join(" ");
    if header.chars().count() > MAX_DERIVED_HEADER_CHARS {
        words[..words.len().min(DERIVED_HEADER_WORDS)].join(" ")
    } else {
        header
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animate/header.rs"]
mod tests;
