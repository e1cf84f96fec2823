//! CPU raster plumbing shared by the header and stroke layers.
//!
//! Vector content is rasterized with `vello_cpu` into fresh transparent layers; layers are then
//! merged with the premultiplied compositing helpers below.

use crate::foundation::core::{Affine, BezPath, Canvas, Rgba8Premul};
use crate::foundation::error::{SketchError, SketchResult};
use crate::foundation::math::mul_div255_u16;

/// A rendered frame: premultiplied RGBA8, tightly packed, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRGBA {
    pub fn solid(canvas: Canvas, color: Rgba8Premul) -> Self {
        let px = color.to_array();
        let mut data = Vec::with_capacity(canvas.rgba_len());
        for _ in 0..canvas.pixel_count() {
            data.extend_from_slice(&px);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
        }
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Premultiplied pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}

pub(crate) fn canvas_u16(canvas: Canvas) -> SketchResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| SketchError::render("canvas width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| SketchError::render("canvas height exceeds u16"))?;
    Ok((w, h))
}

/// Rasterize whatever `draw` records into a fresh transparent canvas-sized layer.
pub(crate) fn paint_layer(
    canvas: Canvas,
    draw: impl FnOnce(&mut vello_cpu::RenderContext) -> SketchResult<()>,
) -> SketchResult<Vec<u8>> {
    let (w, h) = canvas_u16(canvas)?;
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    draw(&mut ctx)?;
    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);
    Ok(pixmap.data_as_u8_slice().to_vec())
}

pub(crate) fn paint_color(c: Rgba8Premul) -> vello_cpu::peniko::Color {
    // peniko colors are straight alpha; every color we paint with is opaque.
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

pub(crate) fn round_stroke(width: f64) -> vello_cpu::kurbo::Stroke {
    vello_cpu::kurbo::Stroke::new(width)
        .with_caps(vello_cpu::kurbo::Cap::Round)
        .with_join(vello_cpu::kurbo::Join::Round)
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub(crate) fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Wrap premultiplied RGBA8 bytes as an image paint.
pub(crate) fn premul_bytes_to_image(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> SketchResult<vello_cpu::Image> {
    let (w, h) = canvas_u16(Canvas { width, height })?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(SketchError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let pixels: Vec<_> = rgba8_premul
        .chunks_exact(4)
        .map(|px| {
            may_have_opacities |= px[3] != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
        })
        .collect();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// `dst = src over dst` for two equally sized premultiplied buffers.
pub(crate) fn over_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        blend_px(d, [s[0], s[1], s[2], s[3]]);
    }
}

/// `dst = (src in mask) over dst`: `src` is kept only where `mask` has coverage.
pub(crate) fn over_masked_in_place(dst: &mut [u8], src: &[u8], mask: &[u8]) {
    for ((d, s), m) in dst
        .chunks_exact_mut(4)
        .zip(src.chunks_exact(4))
        .zip(mask.chunks_exact(4))
    {
        let ma = u16::from(m[3]);
        if ma == 0 {
            continue;
        }
        let keep = |c: u8| mul_div255_u16(u16::from(c), ma) as u8;
        blend_px(d, [keep(s[0]), keep(s[1]), keep(s[2]), keep(s[3])]);
    }
}

/// Blit the first `cols` columns of a `src_w`-wide premultiplied buffer at `(dx, dy)`, clipped to
/// the destination frame.
pub(crate) fn over_region(
    dst: &mut FrameRGBA,
    src: &[u8],
    src_w: u32,
    src_h: u32,
    cols: u32,
    dx: u32,
    dy: u32,
) {
    let cols = cols.min(src_w);
    for y in 0..src_h {
        let ty = dy + y;
        if ty >= dst.height {
            break;
        }
        for x in 0..cols {
            let tx = dx + x;
            if tx >= dst.width {
                break;
            }
            let si = (y as usize * src_w as usize + x as usize) * 4;
            let di = (ty as usize * dst.width as usize + tx as usize) * 4;
            blend_px(
                &mut dst.data[di..di + 4],
                [src[si], src[si + 1], src[si + 2], src[si + 3]],
            );
        }
    }
}

#[inline]
fn blend_px(d: &mut [u8], s: [u8; 4]) {
    let sa = u16::from(s[3]);
    if sa == 0 {
        return;
    }
    if sa == 255 {
        d.copy_from_slice(&s);
        return;
    }
    let inv = 255 - sa;
    for c in 0..4 {
        let v = u16::from(s[c]) + mul_div255_u16(u16::from(d[c]), inv);
        d[c] = v.min(255) as u8;
    }
}
