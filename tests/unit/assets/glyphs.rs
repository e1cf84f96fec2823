use super::*;

fn empty_fonts() -> GlyphRasterizer {
    GlyphRasterizer::from_fontdb(Arc::new(usvg::fontdb::Database::new()))
}

#[test]
fn escape_xml_handles_markup_characters() {
    assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    assert_eq!(escape_xml("tab\there"), "tab here");
}

#[test]
fn baseline_matches_layout_formula() {
    assert_eq!(header_baseline(20), 19.0);
    assert_eq!(header_baseline(16), 16.0);
}

#[test]
fn missing_fonts_measure_zero_and_still_rasterize() {
    let r = empty_fonts();
    assert_eq!(r.face_count(), 0);
    assert_eq!(r.measure("Photosynthesis", 40).unwrap(), 0.0);

    let buf = r.rasterize("Photosynthesis", 40, 0.0).unwrap();
    assert_eq!((buf.width, buf.height), (4, 46));
    assert_eq!(buf.rgba8_premul.len(), 4 * 46 * 4);
}

#[test]
fn empty_text_measures_zero() {
    let r = empty_fonts();
    assert_eq!(r.measure("   ", 40).unwrap(), 0.0);
    assert_eq!(r.fit("", 40, 100.0, 16).unwrap(), (40, 0.0));
}

#[test]
fn header_svg_is_parseable_with_special_characters() {
    let svg = header_svg("R&D <fast>", 20, 100, 26, HexColor::INK);
    let opts = usvg::Options::default();
    assert!(usvg::Tree::from_data(svg.as_bytes(), &opts).is_ok());
}

#[test]
fn system_fonts_shrink_until_fit() {
    let r = GlyphRasterizer::with_system_fonts(None);
    if r.face_count() == 0 {
        return;
    }
    let text = "A rather long header that cannot fit";
    let (size, width) = r.fit(text, 60, 200.0, 16).unwrap();
    assert!(size <= 60);
    assert!(width <= 200.0 || size <= 16);
}
