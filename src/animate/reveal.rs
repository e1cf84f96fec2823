use serde::{Deserialize, Serialize};

use crate::animate::header::{DrawingPlacement, HeaderAnimator};
use crate::animate::raster::{
    FrameRGBA, affine_to_cpu, bezpath_to_cpu, over_in_place, over_masked_in_place, paint_color,
    paint_layer, premul_bytes_to_image, round_stroke,
};
use crate::assets::color::HexColor;
use crate::assets::decode::RasterImage;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex, Rgba8Premul};
use crate::foundation::error::{SketchError, SketchResult};
use crate::strokes::path::DrawingPath;

/// How revealed strokes become visible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealStyle {
    /// Redraw the strokes themselves in a single ink color.
    #[default]
    Monochrome,
    /// Show the color illustration through a mask grown from the revealed strokes.
    ColorMask,
}

/// Ink used for monochrome strokes, and the base width for the color-mask brush.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeStyle {
    pub color: HexColor,
    pub width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: HexColor::BLACK,
            width: 3.0,
        }
    }
}

impl StrokeStyle {
    /// Brush width used to paint the reveal mask.
    pub fn mask_brush_width(&self) -> f64 {
        (self.width * 2.5).floor().max(4.0)
    }
}

/// Maps frame indices to stroke-reveal progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RevealSchedule {
    pub total_frames: u64,
    pub header_frames: u64,
    pub stroke_count: usize,
}

impl RevealSchedule {
    /// Revealed share of the strokes at `frame`: 0 during the header, reaching exactly 1 on the
    /// last frame.
    pub fn fraction(&self, frame: u64) -> f64 {
        if frame < self.header_frames {
            return 0.0;
        }
        let span = self.total_frames.saturating_sub(self.header_frames);
        if span == 0 {
            return 1.0;
        }
        ((frame + 1 - self.header_frames) as f64 / span as f64).clamp(0.0, 1.0)
    }

    pub fn strokes_visible(&self, frame: u64) -> usize {
        let n = (self.stroke_count as f64 * self.fraction(frame)).floor() as usize;
        n.min(self.stroke_count)
    }
}

/// Parameters shared by every frame of one animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationSpec {
    pub canvas: Canvas,
    pub fps: Fps,
    pub duration_secs: f64,
    pub style: RevealStyle,
    pub stroke: StrokeStyle,
}

impl AnimationSpec {
    pub fn total_frames(&self) -> u64 {
        self.fps.secs_to_frames_ceil(self.duration_secs)
    }

    fn validate(&self) -> SketchResult<()> {
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(SketchError::input(format!(
                "animation duration must be positive, got {}",
                self.duration_secs
            )));
        }
        if !self.stroke.width.is_finite() || self.stroke.width <= 0.0 {
            return Err(SketchError::input("stroke width must be positive"));
        }
        Ok(())
    }
}

/// Accumulated stroke (or mask) coverage plus how many strokes it holds.
struct StrokeLayer {
    data: Vec<u8>,
    drawn: usize,
}

/// Produces the frames of one whiteboard animation.
pub struct FrameRenderer {
    spec: AnimationSpec,
    paths: Vec<DrawingPath>,
    header: HeaderAnimator,
    placement: DrawingPlacement,
    schedule: RevealSchedule,
    /// Color illustration already placed below the header (color-mask style only).
    illustration: Option<Vec<u8>>,
}

impl std::fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("spec", &self.spec)
            .field("strokes", &self.paths.len())
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl FrameRenderer {
    /// `image` must already be canvas-sized; `paths` must be in reveal order and live in the
    /// same canvas coordinates.
    pub fn new(
        spec: AnimationSpec,
        image: &RasterImage,
        paths: Vec<DrawingPath>,
        header: HeaderAnimator,
    ) -> SketchResult<Self> {
        spec.validate()?;
        if image.canvas() != spec.canvas {
            return Err(SketchError::input(format!(
                "illustration is {}x{}, expected {}x{}",
                image.width, image.height, spec.canvas.width, spec.canvas.height
            )));
        }

        let placement = header.placement();
        let schedule = RevealSchedule {
            total_frames: spec.total_frames(),
            header_frames: header.frame_count(),
            stroke_count: paths.len(),
        };
        let illustration = match spec.style {
            RevealStyle::Monochrome => None,
            RevealStyle::ColorMask => Some(place_illustration(spec.canvas, image, placement)?),
        };

        Ok(Self {
            spec,
            paths,
            header,
            placement,
            schedule,
            illustration,
        })
    }

    pub fn spec(&self) -> &AnimationSpec {
        &self.spec
    }

    pub fn schedule(&self) -> RevealSchedule {
        self.schedule
    }

    pub fn frame_count(&self) -> u64 {
        self.schedule.total_frames
    }

    pub fn header_frames(&self) -> u64 {
        self.schedule.header_frames
    }

    pub fn stroke_count(&self) -> usize {
        self.paths.len()
    }

    /// Render one frame from scratch (preview and tests).
    pub fn render_frame(&self, index: FrameIndex) -> SketchResult<FrameRGBA> {
        if index.0 >= self.schedule.total_frames {
            return Err(SketchError::input(format!(
                "frame {} is past the end of a {}-frame animation",
                index.0, self.schedule.total_frames
            )));
        }
        let mut layer = self.empty_layer();
        self.extend_layer(&mut layer, self.schedule.strokes_visible(index.0))?;
        self.compose(index.0, &layer)
    }

    /// Render every frame in order into `sink`. Returns the number of frames pushed.
    ///
    /// Stroke coverage is accumulated across frames, so each frame only rasterizes the strokes
    /// that became visible since the previous one.
    #[tracing::instrument(level = "debug", skip_all, fields(frames = self.schedule.total_frames))]
    pub fn render_to_sink(&self, sink: &mut dyn FrameSink) -> SketchResult<u64> {
        sink.begin(SinkConfig {
            width: self.spec.canvas.width,
            height: self.spec.canvas.height,
            fps: self.spec.fps,
        })?;

        let mut layer = self.empty_layer();
        for f in 0..self.schedule.total_frames {
            self.extend_layer(&mut layer, self.schedule.strokes_visible(f))?;
            let frame = self.compose(f, &layer)?;
            sink.push_frame(FrameIndex(f), &frame)?;
        }
        sink.end()?;
        Ok(self.schedule.total_frames)
    }

    fn empty_layer(&self) -> StrokeLayer {
        StrokeLayer {
            data: vec![0; self.spec.canvas.rgba_len()],
            drawn: 0,
        }
    }

    fn extend_layer(&self, layer: &mut StrokeLayer, upto: usize) -> SketchResult<()> {
        let upto = upto.min(self.paths.len());
        if upto <= layer.drawn {
            return Ok(());
        }

        let (color, width) = match self.spec.style {
            RevealStyle::Monochrome => (self.spec.stroke.color, self.spec.stroke.width),
            RevealStyle::ColorMask => (HexColor::BLACK, self.spec.stroke.mask_brush_width()),
        };
        let fresh = &self.paths[layer.drawn..upto];
        let transform = affine_to_cpu(self.placement.transform());
        let strokes = paint_layer(self.spec.canvas, |ctx| {
            ctx.set_transform(transform);
            ctx.set_paint(paint_color(color.to_rgba8_premul()));
            ctx.set_stroke(round_stroke(width));
            for path in fresh {
                ctx.stroke_path(&bezpath_to_cpu(&path.to_bezpath()));
            }
            Ok(())
        })?;
        over_in_place(&mut layer.data, &strokes);
        layer.drawn = upto;
        Ok(())
    }

    fn compose(&self, frame: u64, layer: &StrokeLayer) -> SketchResult<FrameRGBA> {
        let mut out = FrameRGBA::solid(self.spec.canvas, Rgba8Premul::WHITE);
        self.header.draw(frame, &mut out)?;

        match (&self.illustration, self.spec.style) {
            (Some(illustration), RevealStyle::ColorMask) => {
                if self.paths.is_empty() {
                    if frame >= self.schedule.header_frames {
                        over_in_place(&mut out.data, illustration);
                    }
                } else {
                    over_masked_in_place(&mut out.data, illustration, &layer.data);
                }
            }
            _ => over_in_place(&mut out.data, &layer.data),
        }
        Ok(out)
    }
}

fn place_illustration(
    canvas: Canvas,
    image: &RasterImage,
    placement: DrawingPlacement,
) -> SketchResult<Vec<u8>> {
    let paint = premul_bytes_to_image(&image.rgba8_premul, image.width, image.height)?;
    let rect = vello_cpu::kurbo::Rect::new(0.0, 0.0, f64::from(image.width), f64::from(image.height));
    paint_layer(canvas, |ctx| {
        ctx.set_transform(affine_to_cpu(placement.transform()));
        ctx.set_paint(paint);
        ctx.fill_rect(&rect);
        Ok(())
    })
}

#[cfg(test)]
#[path = "../../tests/unit/animate/reveal.rs"]
mod tests;
