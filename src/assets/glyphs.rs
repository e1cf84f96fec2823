//! Header text rasterization.
//!
//! Header titles are laid out by building a tiny SVG document with a `<text>` element and letting
//! `usvg` shape it against a font database, then rasterizing the tree with `resvg`. The font
//! database is owned by a [`GlyphRasterizer`] value that callers create per request and pass
//! explicitly; nothing here is process-global.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::assets::color::HexColor;
use crate::foundation::error::{SketchError, SketchResult};

/// Font stack used for header titles.
pub const HEADER_FONT_FAMILY: &str = "Arial, Helvetica, sans-serif";

/// Horizontal offset of the second, thickening pass over the glyphs.
const DOUBLE_STRIKE_DX: f64 = 0.4;
/// Vertical offset of the second, thickening pass over the glyphs.
const DOUBLE_STRIKE_DY: f64 = 0.2;

/// Premultiplied RGBA8 raster of one header line.
#[derive(Clone, Debug)]
pub struct GlyphBuffer {
    pub width: u32,
    pub height: u32,
    /// Font size the text was rendered at, in pixels.
    pub size_px: u32,
    pub rgba8_premul: Vec<u8>,
}

/// Shapes and rasterizes header text with a request-scoped font database.
#[derive(Clone)]
pub struct GlyphRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
    color: HexColor,
}

impl std::fmt::Debug for GlyphRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphRasterizer")
            .field("faces", &self.face_count())
            .field("color", &self.color)
            .finish()
    }
}

impl GlyphRasterizer {
    /// Load system fonts, plus `.ttf`/`.otf`/`.ttc` files from `extra_font_dir` when given.
    pub fn with_system_fonts(extra_font_dir: Option<&Path>) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = extra_font_dir {
            load_fonts_from_dir(&mut db, dir);
        }
        tracing::debug!(faces = db.len(), "header font database loaded");
        Self {
            fontdb: Arc::new(db),
            color: HexColor::INK,
        }
    }

    /// Rasterizer over an explicit font database (tests use an empty one).
    pub fn from_fontdb(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self {
            fontdb,
            color: HexColor::INK,
        }
    }

    pub fn face_count(&self) -> usize {
        self.fontdb.len()
    }

    /// Advance width of `text` at `size_px`, in pixels.
    ///
    /// Returns 0 when no font can shape the text; callers then render an empty header strip
    /// instead of failing the scene.
    pub fn measure(&self, text: &str, size_px: u32) -> SketchResult<f64> {
        if text.trim().is_empty() || size_px == 0 {
            return Ok(0.0);
        }
        let probe_width = (text.chars().count() as u32 + 2) * size_px * 2;
        let tree = self.parse(text, size_px, probe_width, size_px + 6)?;
        Ok(ink_right_edge(&tree))
    }

    /// Largest size, starting at `start_px` and shrinking by 2 px while above `min_px`, whose
    /// measured width fits in `max_width`. Returns `(size_px, width_px)`.
    pub fn fit(
        &self,
        text: &str,
        start_px: u32,
        max_width: f64,
        min_px: u32,
    ) -> SketchResult<(u32, f64)> {
        let mut size = start_px.max(1);
        let mut width = self.measure(text, size)?;
        while width > max_width && size > min_px {
            size = size.saturating_sub(2).max(1);
            width = self.measure(text, size)?;
        }
        Ok((size, width))
    }

    /// Render `text` at `size_px` into a buffer of `(text_width + 4) x (size_px + 6)` pixels.
    pub fn rasterize(&self, text: &str, size_px: u32, text_width: f64) -> SketchResult<GlyphBuffer> {
        let width = (text_width.ceil().max(0.0) as u32) + 4;
        let height = size_px + 6;
        let tree = self.parse(text, size_px, width, height)?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| SketchError::render("failed to allocate glyph pixmap"))?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::identity(),
            &mut pixmap.as_mut(),
        );
        Ok(GlyphBuffer {
            width,
            height,
            size_px,
            rgba8_premul: pixmap.data().to_vec(),
        })
    }

    fn parse(&self, text: &str, size_px: u32, width: u32, height: u32) -> SketchResult<usvg::Tree> {
        let svg = header_svg(text, size_px, width, height, self.color);
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            font_resolver: font_resolver(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_data(svg.as_bytes(), &opts).context("parse header svg")?;
        Ok(tree)
    }
}

/// Baseline of header text inside its glyph buffer.
pub fn header_baseline(size_px: u32) -> f64 {
    (0.82 * f64::from(size_px)).ceil() + 2.0
}

fn header_svg(text: &str, size_px: u32, width: u32, height: u32, color: HexColor) -> String {
    let escaped = escape_xml(text);
    let baseline = header_baseline(size_px);
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            r#"<g font-family="{family}" font-weight="bold" font-size="{size}" fill="{fill}">"#,
            r#"<text x="2" y="{y}" xml:space="preserve">{t}</text>"#,
            r#"<text x="{x2}" y="{y2}" xml:space="preserve">{t}</text>"#,
            "</g></svg>"
        ),
        w = width,
        h = height,
        family = HEADER_FONT_FAMILY,
        size = size_px,
        fill = color.to_css(),
        y = baseline,
        x2 = 2.0 + DOUBLE_STRIKE_DX,
        y2 = baseline + DOUBLE_STRIKE_DY,
        t = escaped,
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

/// Right edge of everything drawn, measured from the text origin at x = 2.
fn ink_right_edge(tree: &usvg::Tree) -> f64 {
    let root = tree.root();
    if !root.has_children() {
        return 0.0;
    }
    let right = f64::from(root.abs_bounding_box().right()) - 2.0 - DOUBLE_STRIKE_DX;
    right.max(0.0)
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "font directory is not readable");
        return;
    };
    for entry in rd.flatten() {
        let path = entry.path();
        let is_font = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"))
            .unwrap_or(false);
        if is_font && path.is_file() && db.load_font_file(&path).is_err() {
            tracing::warn!(path = %path.display(), "skipping unreadable font file");
        }
    }
}

fn font_resolver() -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families: Vec<usvg::fontdb::Family<'_>> = font
                .families()
                .iter()
                .map(|family| match family {
                    usvg::FontFamily::Serif => usvg::fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => usvg::fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => usvg::fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => usvg::fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => usvg::fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => usvg::fontdb::Family::Name(s),
                })
                .collect();
            families.push(usvg::fontdb::Family::SansSerif);

            let query = usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight(font.weight()),
                stretch: usvg::fontdb::Stretch::Normal,
                style: usvg::fontdb::Style::Normal,
            };
            if let Some(id) = fontdb.query(&query) {
                return Some(id);
            }
            fontdb.faces().next().map(|f| f.id)
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/glyphs.rs"]
mod tests;
