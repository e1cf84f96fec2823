use super::*;

fn en() -> LanguageTag {
    LanguageTag::parse("en").unwrap()
}

fn cues(durations: &[f64]) -> Vec<CaptionCue<'static>> {
    durations
        .iter()
        .map(|&d| CaptionCue {
            text: Some("x"),
            duration_secs: d,
        })
        .collect()
}

#[test]
fn entries_run_on_a_cumulative_clock() {
    let track = build_track(&en(), &cues(&[5.0, 7.0, 6.0])).unwrap();
    let spans: Vec<(f64, f64)> = track
        .entries
        .iter()
        .map(|e| (e.start_secs, e.end_secs))
        .collect();
    assert_eq!(spans, vec![(0.0, 5.0), (5.0, 12.0), (12.0, 18.0)]);
    assert_eq!(track.duration_secs(), 18.0);
    assert_eq!(track.language, "en");
}

#[test]
fn entries_are_contiguous_for_fractional_durations() {
    let durations = [0.1, 0.2, 1.7, 3.333, 0.05, 9.9];
    let track = build_track(&en(), &cues(&durations)).unwrap();
    let mut sum = 0.0;
    for (e, d) in track.entries.iter().zip(durations) {
        assert_eq!(e.start_secs, sum);
        sum += d;
        assert_eq!(e.end_secs, sum);
    }
    for w in track.entries.windows(2) {
        assert_eq!(w[0].end_secs, w[1].start_secs);
    }
}

#[test]
fn missing_text_becomes_scene_placeholder() {
    let cues = [
        CaptionCue {
            text: None,
            duration_secs: 1.0,
        },
        CaptionCue {
            text: Some("  "),
            duration_secs: 1.0,
        },
        CaptionCue {
            text: Some(" Hi "),
            duration_secs: 1.0,
        },
    ];
    let track = build_track(&en(), &cues).unwrap();
    let texts: Vec<&str> = track.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Scene 1", "Scene 2", "Hi"]);
}

#[test]
fn non_positive_duration_is_rejected() {
    assert!(build_track(&en(), &cues(&[1.0, 0.0])).is_err());
}

#[test]
fn srt_output_format() {
    let track = build_track(&en(), &cues(&[1.5, 3661.25])).unwrap();
    let srt = track.to_srt();
    assert_eq!(
        srt,
        "1\n00:00:00,000 --> 00:00:01,500\nx\n\n2\n00:00:01,500 --> 01:01:02,750\nx\n\n"
    );
}

#[test]
fn timestamps_round_to_milliseconds() {
    assert_eq!(srt_timestamp(0.0), "00:00:00,000");
    assert_eq!(srt_timestamp(12.0004), "00:00:12,000");
    assert_eq!(srt_timestamp(59.9996), "00:01:00,000");
    assert_eq!(srt_timestamp(-3.0), "00:00:00,000");
}
