use super::*;

fn write(dir: &Path, name: &str, bytes: &[u8]) {
    std::fs::write(dir.join(name), bytes).unwrap();
}

#[test]
fn manifest_loads_media_relative_to_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "s1.png", b"png");
    write(dir.path(), "s1.mp3", b"mp3");
    write(dir.path(), "s1_es.mp3", b"es-mp3");
    write(dir.path(), "talk.mp4", b"mp4");
    let json = r#"{
        "aspectRatio": "9:16",
        "languages": ["en", "es"],
        "scenes": [
            { "kind": "whiteboard_animation_source", "image": "s1.png", "header": "Cells",
              "audio": "s1.mp3", "caption": "Cells are small.", "duration": 5,
              "localized": { "es": { "audio": "s1_es.mp3", "caption": "Hola" } } },
            { "id": "talk", "kind": "avatar", "video": "talk.mp4", "duration": 2.5 }
        ]
    }"#;
    write(dir.path(), "req.json", json.as_bytes());

    let req = CompositionRequest::from_manifest_path(&dir.path().join("req.json")).unwrap();
    assert_eq!(req.aspect_ratio, AspectRatio::Portrait);
    assert_eq!(req.scenes.len(), 2);
    assert_eq!(req.scenes[0].id, "scene-1");
    assert_eq!(req.scenes[1].id, "talk");
    match &req.scenes[0].kind {
        SceneKind::WhiteboardAnimationSource { image, header } => {
            assert_eq!(image.bytes.as_slice(), b"png");
            assert_eq!(image.extension.as_deref(), Some("png"));
            assert_eq!(header.as_deref(), Some("Cells"));
        }
        other => panic!("unexpected kind {other:?}"),
    }
    let es = &req.scenes[0].localized["es"];
    assert_eq!(es.audio.as_ref().unwrap().bytes.as_slice(), b"es-mp3");
    assert!(matches!(req.scenes[1].kind, SceneKind::AvatarVideo { .. }));
    assert!(req.validate().is_ok());
}

#[test]
fn missing_media_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let json = r#"{ "languages": ["en"], "scenes": [
        { "kind": "whiteboard_image", "image": "nope.png", "audio": "nope.mp3", "duration": 1 } ] }"#;
    let m = Manifest::from_json(json.as_bytes()).unwrap();
    assert_eq!(m.aspect_ratio, AspectRatio::Landscape);
    assert!(m.load(dir.path()).is_err());
}

#[test]
fn unknown_kind_is_a_serde_error() {
    let json = r#"{ "languages": ["en"], "scenes": [
        { "kind": "hologram", "image": "a.png", "duration": 1 } ] }"#;
    assert!(matches!(
        Manifest::from_json(json.as_bytes()),
        Err(SketchError::Serde(_))
    ));
}
