use super::*;

/// `#` is black ink, anything else white paper.
fn raster_from_rows(rows: &[&str]) -> RasterImage {
    let height = rows.len() as u32;
    let width = rows[0].len() as u32;
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for row in rows {
        for c in row.chars() {
            let v = if c == '#' { 0 } else { 255 };
            rgba.extend_from_slice(&[v, v, v, 255]);
        }
    }
    RasterImage::from_straight_rgba8(width, height, rgba).unwrap()
}

#[test]
fn white_image_yields_no_paths() {
    let img = RasterImage::from_straight_rgba8(16, 8, vec![255; 16 * 8 * 4]).unwrap();
    let (paths, stats) = extract_paths_with_stats(&img);
    assert!(paths.is_empty());
    assert_eq!(stats, ExtractionStats::default());
}

#[test]
fn transparent_pixels_count_as_paper() {
    let img = RasterImage::from_straight_rgba8(4, 4, vec![0; 4 * 4 * 4]).unwrap();
    assert_eq!(InkMask::from_raster(&img).ink_pixels(), 0);
}

#[test]
fn small_components_are_discarded() {
    let img = raster_from_rows(&[
        "##.......",
        "##.......",
        ".........",
        "...######",
        ".........",
    ]);
    let (paths, stats) = extract_paths_with_stats(&img);
    assert_eq!(stats.components, 2);
    assert_eq!(stats.discarded, 1);
    assert_eq!(paths.len(), 1);
    assert!(paths.iter().all(|p| p.len() >= MIN_STROKE_POINTS));
    assert_eq!(paths[0].first(), PathPoint::new(3, 3));
}

#[test]
fn diagonal_neighbours_join_one_component() {
    let img = raster_from_rows(&[
        "#.......", //
        ".#......",
        "..#.....",
        "...#....",
        "....#...",
        ".....#..",
    ]);
    let paths = extract_paths(&img);
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].len(), 6);
}

#[test]
fn every_ink_pixel_appears_exactly_once() {
    let img = raster_from_rows(&[
        "##########", //
        "#........#",
        "#.######.#",
        "#........#",
        "##########",
    ]);
    let mask = InkMask::from_raster(&img);
    let paths = extract_paths(&img);
    let total: usize = paths.iter().map(|p| p.len()).sum();
    assert_eq!(total, mask.ink_pixels());

    let mut seen = std::collections::HashSet::new();
    for p in paths.iter().flat_map(|p| p.points()) {
        assert!(seen.insert(*p), "duplicate point {p:?}");
    }
}

#[test]
fn all_ink_image_terminates_with_one_path() {
    let img = RasterImage::from_straight_rgba8(64, 48, [0, 0, 0, 255].repeat(64 * 48)).unwrap();
    let paths = extract_paths(&img);
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].len(), 64 * 48);
}

#[test]
fn extraction_is_deterministic() {
    let rows = [
        "..##....##..",
        "..##....##..",
        "..##....##..",
        "............",
        ".##########.",
        "............",
    ];
    let img = raster_from_rows(&rows);
    let a = crate::strokes::extract_strokes(&img);
    let b = crate::strokes::extract_strokes(&img);
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
}
