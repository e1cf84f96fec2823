use super::*;

#[test]
fn first_error_reports_earliest_failure_in_input_order() {
    let items: Vec<SketchResult<u32>> = vec![
        Ok(1),
        Err(SketchError::input("second")),
        Err(SketchError::input("third")),
    ];
    match first_error(items) {
        Err(SketchError::Input(msg)) => assert_eq!(msg, "second"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(first_error(vec![Ok(1), Ok(2)]).unwrap(), vec![1, 2]);
}

#[test]
fn thread_pool_rejects_zero_threads() {
    assert!(build_thread_pool(Some(0)).is_err());
    assert_eq!(build_thread_pool(Some(2)).unwrap().current_num_threads(), 2);
    assert!(build_thread_pool(None).is_ok());
}

#[test]
fn output_is_written_per_language() {
    let tag = LanguageTag::parse("es").unwrap();
    let captions = SubtitleTrack {
        language: "es".into(),
        entries: Vec::new(),
    };
    let out = CompositionOutput {
        canvas: Canvas {
            width: 4,
            height: 4,
        },
        fps: Fps::OUTPUT,
        deliverables: vec![LanguageDeliverable {
            language: tag.clone(),
            display_name: tag.display_name(),
            native_name: tag.native_name(),
            video: b"video".to_vec(),
            duration_secs: Some(1.0),
            captions,
            srt: "1\n".into(),
            captions_embedded: false,
        }],
    };
    let dir = tempfile::tempdir().unwrap();
    let written = out.write_to_dir(dir.path()).unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(std::fs::read(dir.path().join("es.mp4")).unwrap(), b"video");
    assert_eq!(std::fs::read_to_string(dir.path().join("es.srt")).unwrap(), "1\n");
    let summary: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["deliverables"][0]["language"], "es");
    assert_eq!(summary["deliverables"][0]["display_name"], "Spanish");
    assert!(out.deliverable("ES").is_some());
}
