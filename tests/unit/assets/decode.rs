use std::io::Cursor;

use super::*;

fn png_bytes(img: image::RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50u8, 200u8, 128u8]).unwrap();
    let prepared = decode_image(&png_bytes(img)).unwrap();
    assert_eq!(prepared.width, 1);
    assert_eq!(prepared.height, 1);
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn empty_and_truncated_bytes_are_input_errors() {
    assert!(matches!(decode_image(&[]), Err(SketchError::Input(_))));

    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255]));
    let bytes = png_bytes(img);
    let truncated = &bytes[..bytes.len() / 3];
    assert!(matches!(decode_image(truncated), Err(SketchError::Input(_))));
    assert!(matches!(
        decode_image(b"definitely not an image"),
        Err(SketchError::Input(_))
    ));
}

#[test]
fn decode_to_canvas_resamples_to_target() {
    let img = image::RgbaImage::from_pixel(10, 5, image::Rgba([255, 255, 255, 255]));
    let canvas = Canvas {
        width: 20,
        height: 12,
    };
    let prepared = decode_image_to_canvas(&png_bytes(img), canvas).unwrap();
    assert_eq!(prepared.canvas(), canvas);
    assert_eq!(prepared.rgba8_premul.len(), 20 * 12 * 4);
    assert!(prepared.rgba8_premul.iter().all(|&b| b == 255));
}

#[test]
fn encode_png_round_trips_opaque_pixels() {
    let data = vec![10u8, 20, 30, 255, 200, 100, 0, 255];
    let png = encode_png(2, 1, &data).unwrap();
    let back = decode_image(&png).unwrap();
    assert_eq!(back.rgba8_premul.as_slice(), data.as_slice());
}
