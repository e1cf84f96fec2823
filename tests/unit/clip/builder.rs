use std::io::Cursor;
use std::sync::Arc;

use super::*;
use crate::encode::dry_run::{DryRunEncoder, DryRunMedia};

const CANVAS: Canvas = Canvas {
    width: 64,
    height: 36,
};

fn png(w: u32, h: u32, px: [u8; 4]) -> MediaBlob {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    MediaBlob::new(buf, Some("png"))
}

fn audio() -> MediaBlob {
    MediaBlob::new(b"ID3-fake-audio".to_vec(), Some("mp3"))
}

fn rasterizer() -> GlyphRasterizer {
    GlyphRasterizer::from_fontdb(Arc::new(usvg::fontdb::Database::new()))
}

fn builder<'a>(enc: &'a DryRunEncoder, glyphs: &'a GlyphRasterizer) -> ClipBuilder<'a> {
    ClipBuilder::new(
        enc,
        glyphs,
        CANVAS,
        Fps::OUTPUT,
        AnimationSettings {
            style: RevealStyle::Monochrome,
            stroke: StrokeStyle::default(),
            header_seconds: 0.5,
        },
        RetryPolicy::NEVER,
    )
}

fn en() -> LanguageTag {
    LanguageTag::parse("en").unwrap()
}

#[test]
fn still_image_is_held_on_a_white_letterbox() {
    let dir = tempfile::tempdir().unwrap();
    let (enc, glyphs) = (DryRunEncoder::new(), rasterizer());
    let b = builder(&enc, &glyphs);
    let scene = Scene::new(
        "s",
        2.0,
        SceneKind::WhiteboardImage {
            image: png(10, 10, [255, 255, 255, 255]),
        },
    )
    .with_audio(audio());

    let prepared = b.prepare_visual(0, &scene, dir.path()).unwrap();
    let PreparedVisual::Shared { visual, letterbox } = &prepared else {
        panic!("expected shared visual");
    };
    assert!(matches!(visual, VisualInput::StillImage(p) if p.ends_with("scene_001_image.png")));
    assert_eq!(*letterbox, HexColor::WHITE);

    let clip = b.build_clip(0, &scene, &prepared, &en(), dir.path()).unwrap();
    assert!(clip.path.ends_with("scene_001.mp4"));
    assert_eq!(clip.duration_secs, 2.0);

    let jobs = enc.normalized();
    assert_eq!(jobs.len(), 1);
    assert!(matches!(&jobs[0].audio, AudioInput::File(p) if p.ends_with("scene_001_audio.mp3")));
    assert_eq!(jobs[0].canvas, CANVAS);
    assert!(jobs[0].fades.is_none());
}

#[test]
fn blank_illustration_animates_without_strokes() {
    let dir = tempfile::tempdir().unwrap();
    let (enc, glyphs) = (DryRunEncoder::new(), rasterizer());
    let b = builder(&enc, &glyphs);
    let scene = Scene::new(
        "blank",
        1.0,
        SceneKind::WhiteboardAnimationSource {
            image: png(32, 18, [255, 255, 255, 255]),
            header: Some("Blank page".into()),
        },
    )
    .with_audio(audio());

    let prepared = b.prepare_visual(2, &scene, dir.path()).unwrap();
    let PreparedVisual::Shared {
        visual: VisualInput::Video(path),
        ..
    } = &prepared
    else {
        panic!("expected encoded animation");
    };
    let media = DryRunMedia::read(path).unwrap();
    assert_eq!(media.kind, "animation");
    assert_eq!(media.frames, Some(30));
    assert!(path.ends_with("scene_003_animation.mp4"));
}

#[test]
fn corrupt_image_fails_validation_for_that_scene() {
    let dir = tempfile::tempdir().unwrap();
    let (enc, glyphs) = (DryRunEncoder::new(), rasterizer());
    let scene = Scene::new(
        "bad",
        1.0,
        SceneKind::WhiteboardAnimationSource {
            image: MediaBlob::new(b"not a png".to_vec(), Some("png")),
            header: None,
        },
    )
    .with_audio(audio());
    let err = builder(&enc, &glyphs)
        .prepare_visual(4, &scene, dir.path())
        .unwrap_err();
    assert_eq!(err.location(), Some((Stage::Validation, Some(4))));
    assert!(enc.normalized().is_empty());
}

#[test]
fn unreadable_source_video_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let (enc, glyphs) = (DryRunEncoder::new(), rasterizer());
    let scene = Scene::new(
        "veo",
        3.0,
        SceneKind::Veo3Video {
            video: MediaBlob::new(b"truncated".to_vec(), Some("mp4")),
        },
    )
    .with_audio(audio());
    let err = builder(&enc, &glyphs)
        .prepare_visual(1, &scene, dir.path())
        .unwrap_err();
    match err {
        SketchError::Stage { source, scene, .. } => {
            assert_eq!(scene, Some(1));
            assert!(matches!(*source, SketchError::Input(_)));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn veo_video_is_letterboxed_black_with_narration() {
    let dir = tempfile::tempdir().unwrap();
    let (enc, glyphs) = (DryRunEncoder::new(), rasterizer());
    let b = builder(&enc, &glyphs);
    let video = DryRunMedia::source_video(8.0, false).to_bytes().unwrap();
    let scene = Scene::new(
        "veo",
        3.0,
        SceneKind::Veo3Video {
            video: MediaBlob::new(video, Some("mp4")),
        },
    )
    .with_audio(audio());
    let prepared = b.prepare_visual(0, &scene, dir.path()).unwrap();
    b.build_clip(0, &scene, &prepared, &en(), dir.path()).unwrap();
    let job = &enc.normalized()[0];
    assert_eq!(job.letterbox, HexColor::BLACK);
    assert!(matches!(job.visual, VisualInput::Video(_)));
    assert!(matches!(job.audio, AudioInput::File(_)));
}

#[test]
fn avatar_clips_use_embedded_audio_and_fade_when_long_enough() {
    let dir = tempfile::tempdir().unwrap();
    let (enc, glyphs) = (DryRunEncoder::new(), rasterizer());
    let b = builder(&enc, &glyphs);
    let video = DryRunMedia::source_video(4.0, true).to_bytes().unwrap();
    let long = Scene::new(
        "avatar",
        2.0,
        SceneKind::AvatarVideo {
            video: MediaBlob::new(video.clone(), Some("mp4")),
        },
    );
    let short = Scene {
        duration_secs: 0.6,
        ..long.clone()
    };

    let prepared = b.prepare_visual(0, &long, dir.path()).unwrap();
    assert_eq!(prepared, PreparedVisual::PerLanguage);
    b.build_clip(0, &long, &prepared, &en(), dir.path()).unwrap();
    b.build_clip(1, &short, &prepared, &en(), dir.path()).unwrap();

    let jobs = enc.normalized();
    assert_eq!(jobs[0].audio, AudioInput::Embedded);
    assert_eq!(
        jobs[0].fades,
        Some(Fades {
            fade_in_secs: 0.3,
            fade_out_secs: 0.4
        })
    );
    assert!(jobs[1].fades.is_none());
}

#[test]
fn avatar_without_speech_track_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (enc, glyphs) = (DryRunEncoder::new(), rasterizer());
    let b = builder(&enc, &glyphs);
    let video = DryRunMedia::source_video(4.0, false).to_bytes().unwrap();
    let scene = Scene::new(
        "mute",
        2.0,
        SceneKind::AvatarVideo {
            video: MediaBlob::new(video, Some("mp4")),
        },
    );
    let err = b
        .build_clip(0, &scene, &PreparedVisual::PerLanguage, &en(), dir.path())
        .unwrap_err();
    assert_eq!(err.location(), Some((Stage::Validation, Some(0))));
}

#[test]
fn missing_language_audio_is_reported_with_language() {
    let dir = tempfile::tempdir().unwrap();
    let (enc, glyphs) = (DryRunEncoder::new(), rasterizer());
    let b = builder(&enc, &glyphs);
    let scene = Scene::new(
        "s",
        1.0,
        SceneKind::WhiteboardImage {
            image: png(4, 4, [0, 0, 0, 255]),
        },
    );
    let prepared = b.prepare_visual(0, &scene, dir.path()).unwrap();
    let err = b
        .build_clip(0, &scene, &prepared, &en(), dir.path())
        .unwrap_err();
    assert!(matches!(
        err,
        SketchError::Stage { ref language, .. } if language.as_deref() == Some("en")
    ));
}
