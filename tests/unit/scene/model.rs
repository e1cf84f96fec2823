use super::*;
use crate::foundation::error::Stage;

fn blob(ext: &str) -> MediaBlob {
    MediaBlob::new(vec![1, 2, 3], Some(ext))
}

fn tags(codes: &[&str]) -> Vec<LanguageTag> {
    codes.iter().map(|c| LanguageTag::parse(c).unwrap()).collect()
}

fn image_scene(duration: f64) -> Scene {
    Scene::new(
        "s",
        duration,
        SceneKind::WhiteboardImage {
            image: blob("png"),
        },
    )
    .with_audio(blob("mp3"))
}

#[test]
fn aspect_ratios_map_to_fixed_canvases() {
    assert_eq!(
        "16:9".parse::<AspectRatio>().unwrap().canvas(),
        Canvas {
            width: 1920,
            height: 1080
        }
    );
    assert_eq!(AspectRatio::Portrait.canvas().width, 1080);
    assert_eq!(AspectRatio::Square.canvas().height, 1024);
    assert!("4:3".parse::<AspectRatio>().is_err());

    let r: AspectRatio = serde_json::from_str("\"9:16\"").unwrap();
    assert_eq!(r, AspectRatio::Portrait);
    assert_eq!(serde_json::to_string(&AspectRatio::Square).unwrap(), "\"1:1\"");
}

#[test]
fn non_positive_durations_are_rejected() {
    let langs = tags(&["en"]);
    for d in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            image_scene(d).validate(&langs),
            Err(SketchError::Input(_))
        ));
    }
    assert!(image_scene(0.5).validate(&langs).is_ok());
}

#[test]
fn durations_shorter_than_one_frame_are_rejected() {
    let langs = tags(&["en"]);
    for d in [0.0004, 0.01, 0.033] {
        let err = image_scene(d).validate(&langs).unwrap_err();
        assert!(err.to_string().contains("shorter than one frame"), "{err}");
    }
    assert!(image_scene(1.0 / 30.0).validate(&langs).is_ok());
    assert!(image_scene(0.034).validate(&langs).is_ok());
}

#[test]
fn empty_media_is_rejected() {
    let scene = Scene::new(
        "v",
        2.0,
        SceneKind::Veo3Video {
            video: MediaBlob::new(Vec::new(), Some("mp4")),
        },
    )
    .with_audio(blob("mp3"));
    assert!(scene.validate(&tags(&["en"])).is_err());
}

#[test]
fn narrated_scenes_need_audio_for_every_language() {
    let scene = Scene::new(
        "s",
        3.0,
        SceneKind::WhiteboardImage {
            image: blob("png"),
        },
    )
    .with_localized(
        "es",
        LocalizedNarration {
            audio: Some(blob("mp3")),
            ..Default::default()
        },
    );
    assert!(scene.validate(&tags(&["es"])).is_ok());
    assert!(scene.validate(&tags(&["es", "en"])).is_err());
}

#[test]
fn avatar_scenes_must_not_carry_separate_audio() {
    let avatar = Scene::new(
        "a",
        4.0,
        SceneKind::AvatarVideo {
            video: blob("mp4"),
        },
    );
    assert!(avatar.validate(&tags(&["en"])).is_ok());
    assert!(avatar.clone().with_audio(blob("mp3")).validate(&tags(&["en"])).is_err());
}

#[test]
fn per_language_video_only_for_avatars() {
    let scene = image_scene(2.0).with_localized(
        "fr",
        LocalizedNarration {
            video: Some(blob("mp4")),
            ..Default::default()
        },
    );
    assert!(scene.validate(&tags(&["fr"])).is_err());
}

#[test]
fn localized_lookup_prefers_exact_then_base_then_default() {
    let scene = image_scene(2.0)
        .with_caption("Hello")
        .with_localized(
            "es",
            LocalizedNarration {
                caption: Some("Hola".into()),
                ..Default::default()
            },
        )
        .with_localized(
            "es-MX",
            LocalizedNarration {
                caption: Some("Qué onda".into()),
                ..Default::default()
            },
        );
    let t = |c: &str| LanguageTag::parse(c).unwrap();
    assert_eq!(scene.caption_for(&t("es-mx")), Some("Qué onda"));
    assert_eq!(scene.caption_for(&t("es-AR")), Some("Hola"));
    assert_eq!(scene.caption_for(&t("en")), Some("Hello"));
}

#[test]
fn avatar_video_override_per_language() {
    let es_video = MediaBlob::new(vec![9, 9], Some("mp4"));
    let scene = Scene::new(
        "a",
        4.0,
        SceneKind::AvatarVideo {
            video: blob("mp4"),
        },
    )
    .with_localized(
        "es",
        LocalizedNarration {
            video: Some(es_video.clone()),
            ..Default::default()
        },
    );
    let t = |c: &str| LanguageTag::parse(c).unwrap();
    assert_eq!(scene.video_for(&t("es")), Some(&es_video));
    assert_eq!(scene.video_for(&t("en")).map(|b| b.len()), Some(3));
}

#[test]
fn request_validation_reports_scene_index() {
    let req = CompositionRequest {
        aspect_ratio: AspectRatio::Landscape,
        scenes: vec![image_scene(1.0), image_scene(0.0)],
        languages: vec!["en".into()],
    };
    let err = req.validate().unwrap_err();
    assert_eq!(err.location(), Some((Stage::Validation, Some(1))));
}

#[test]
fn request_rejects_missing_or_duplicate_languages() {
    let mut req = CompositionRequest {
        aspect_ratio: AspectRatio::Square,
        scenes: vec![image_scene(1.0)],
        languages: vec![],
    };
    assert!(req.validate().is_err());
    req.languages = vec!["en-us".into(), "en-US".into()];
    assert!(req.validate().is_err());
    req.languages = vec!["en".into(), "es".into()];
    assert_eq!(req.validate().unwrap().len(), 2);
    assert_eq!(req.total_duration_secs(), 1.0);
}

#[test]
fn blob_file_names_use_extension_hint() {
    assert_eq!(blob(".PNG").file_name("scene_001", "bin"), "scene_001.png");
    assert_eq!(
        MediaBlob::new(vec![1], None).file_name("a", "mp3"),
        "a.mp3"
    );
}

#[test]
fn animation_title_comes_from_the_default_caption_for_every_language() {
    let animated = |header: Option<&str>| {
        Scene::new(
            "w",
            4.0,
            SceneKind::WhiteboardAnimationSource {
                image: blob("png"),
                header: header.map(str::to_owned),
            },
        )
        .with_audio(blob("mp3"))
        .with_caption("Plants make food. They use light.")
        .with_localized(
            "es",
            LocalizedNarration {
                caption: Some("Las plantas hacen comida.".to_owned()),
                ..Default::default()
            },
        )
    };

    let derived = animated(None);
    assert_eq!(derived.animation_title().as_deref(), Some("Plants make food"));
    assert_eq!(
        derived.caption_for(&tags(&["es"])[0]),
        Some("Las plantas hacen comida.")
    );

    assert_eq!(animated(Some("  Cells ")).animation_title().as_deref(), Some("Cells"));
    assert_eq!(animated(Some("")).animation_title().as_deref(), Some(""));
    assert_eq!(image_scene(2.0).animation_title(), None);
}
