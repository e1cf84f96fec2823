use super::*;
use crate::assets::color::HexColor;
use crate::encode::encoder::Fades;
use crate::foundation::core::Canvas;

fn args_to_strings(args: Vec<OsString>) -> Vec<String> {
    args.into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn job(visual: VisualInput, audio: AudioInput, fades: Option<Fades>) -> NormalizeJob {
    NormalizeJob {
        visual,
        audio,
        duration_secs: 5.0,
        canvas: Canvas::new(1920, 1080).unwrap(),
        fps: Fps::OUTPUT,
        letterbox: HexColor::WHITE,
        fades,
        out_path: PathBuf::from("/tmp/out/scene_000.mp4"),
    }
}

#[test]
fn still_image_is_looped_letterboxed_and_cut() {
    let args = args_to_strings(normalize_args(&job(
        VisualInput::StillImage(PathBuf::from("img.png")),
        AudioInput::File(PathBuf::from("voice.mp3")),
        None,
    )));
    let joined = args.join(" ");
    assert!(joined.contains("-loop 1 -framerate 30/1 -i img.png -i voice.mp3"));
    assert!(joined.contains(
        "scale=1920:1080:force_original_aspect_ratio=decrease,pad=1920:1080:(ow-iw)/2:(oh-ih)/2:color=0xFFFFFF"
    ));
    assert!(joined.contains("[1:a]aresample=44100"));
    assert!(joined.contains("apad[a]"));
    assert!(!joined.contains("tpad"));
    assert!(joined.contains("-t 5.000"));
    assert!(joined.contains("-profile:v high -level:v 4.2 -pix_fmt yuv420p"));
    assert!(joined.contains("-c:a aac -ar 44100 -ac 2 -b:a 160k"));
    assert_eq!(args.last().map(String::as_str), Some("/tmp/out/scene_000.mp4"));
}

#[test]
fn avatar_video_uses_embedded_audio_and_fades() {
    let args = args_to_strings(normalize_args(&job(
        VisualInput::Video(PathBuf::from("avatar.mp4")),
        AudioInput::Embedded,
        Some(Fades {
            fade_in_secs: 0.3,
            fade_out_secs: 0.4,
        }),
    )));
    let joined = args.join(" ");
    assert!(!joined.contains("-loop"));
    assert!(joined.contains("tpad=stop_mode=clone:stop_duration=5.000"));
    assert!(joined.contains("fade=t=in:st=0:d=0.300,fade=t=out:st=4.600:d=0.400"));
    assert!(joined.contains("[0:a]aresample"));
    assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
}

#[test]
fn concat_list_escapes_like_the_demuxer_expects() {
    let list = concat_list(&[
        PathBuf::from("/tmp/a b/scene_000.mp4"),
        PathBuf::from("/tmp/it's/scene_001.mp4"),
    ]);
    assert_eq!(
        list,
        "file /tmp/a\\ b/scene_000.mp4\nfile /tmp/it\\'s/scene_001.mp4\n"
    );
}

#[test]
fn concat_copies_streams_and_muxes_subtitles() {
    let job = ConcatJob {
        clips: vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")],
        list_path: PathBuf::from("concat.txt"),
        subtitles: Some(PathBuf::from("en.srt")),
        language: Some("en-US".to_owned()),
        out_path: PathBuf::from("final.mp4"),
    };
    let joined = args_to_strings(concat_args(&job)).join(" ");
    assert!(joined.contains("-f concat -safe 0 -i concat.txt -i en.srt"));
    assert!(joined.contains("-map 1:s -c:s mov_text"));
    assert!(joined.contains("-c:v copy -c:a copy"));
    assert!(joined.contains("-metadata:s:a:0 language=en"));
    assert!(joined.contains("-metadata:s:s:0 language=en"));
}

#[test]
fn concat_without_subtitles_maps_only_av() {
    let job = ConcatJob {
        clips: vec![PathBuf::from("a.mp4")],
        list_path: PathBuf::from("concat.txt"),
        subtitles: None,
        language: None,
        out_path: PathBuf::from("final.mp4"),
    };
    let joined = args_to_strings(concat_args(&job)).join(" ");
    assert!(!joined.contains("mov_text"));
    assert!(!joined.contains("language="));
}

#[test]
fn probe_json_is_parsed_into_stream_params() {
    let json = br#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "profile": "High", "level": 42,
             "pix_fmt": "yuv420p", "width": 1920, "height": 1080, "r_frame_rate": "30/1"},
            {"codec_type": "audio", "codec_name": "aac", "sample_rate": "44100", "channels": 2}
        ],
        "format": {"duration": "5.016000"}
    }"#;
    let report = parse_probe_json(json).unwrap();
    assert!(report.has_video && report.has_audio);
    assert_eq!(report.duration_secs, Some(5.016));
    assert_eq!(report.params.video_codec, "h264");
    assert_eq!(report.params.level, Some(42));
    assert_eq!(report.params.sample_rate, Some(44_100));
    assert_eq!(report.params.frame_rate, "30/1");

    let mut other = report.params.clone();
    other.width = 1080;
    other.channels = Some(1);
    let diff = report.params.mismatches(&other);
    assert_eq!(diff.len(), 2);
    assert!(diff[0].starts_with("size"));
}

#[test]
fn probe_json_without_streams_reports_nothing() {
    let report = parse_probe_json(br#"{"streams": []}"#).unwrap();
    assert!(!report.has_video);
    assert_eq!(report.duration_secs, None);
    assert!(matches!(
        parse_probe_json(b"not json"),
        Err(SketchError::Serde(_))
    ));
}

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &[0, 0, 0, 0], [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn sink_rejects_odd_dimensions_before_spawning() {
    let mut sink = FfmpegSink::new(
        FfmpegEncoderOpts::default(),
        FfmpegSinkOpts::new("/tmp/never.mp4"),
    );
    let err = sink
        .begin(SinkConfig {
            width: 641,
            height: 480,
            fps: Fps::OUTPUT,
        })
        .unwrap_err();
    assert!(matches!(err, SketchError::Input(_)));
}

#[test]
fn codec_args_pin_gop_and_frame_rate() {
    let args = clip_codec_args(Fps::OUTPUT).join(" ");
    assert!(args.contains("-g 60 -bf 0 -crf 20 -preset veryfast"));
    assert!(args.ends_with("-r 30/1 -fps_mode cfr"));
}

#[cfg(unix)]
fn fake_ffmpeg(dir: &Path, body: &str, timeout: Option<Duration>) -> FfmpegEncoderOpts {
    use std::os::unix::fs::PermissionsExt as _;

    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    FfmpegEncoderOpts {
        ffmpeg: path,
        ffprobe: PathBuf::from("ffprobe"),
        timeout,
    }
}

#[cfg(unix)]
fn stream_frames(sink: &mut FfmpegSink, count: u64) -> SketchResult<()> {
    let canvas = Canvas::new(320, 240).unwrap();
    sink.begin(SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps: Fps::OUTPUT,
    })?;
    let frame = FrameRGBA::solid(canvas, HexColor::WHITE.to_rgba8_premul());
    for i in 0..count {
        sink.push_frame(FrameIndex(i), &frame)?;
    }
    sink.end()
}

#[cfg(unix)]
#[test]
fn stalled_encoder_is_killed_at_the_deadline_while_streaming() {
    let dir = tempfile::tempdir().unwrap();
    let tools = fake_ffmpeg(dir.path(), "exec sleep 20", Some(Duration::from_secs(1)));
    let mut sink = FfmpegSink::new(tools, FfmpegSinkOpts::new(dir.path().join("out.mp4")));

    let started = std::time::Instant::now();
    let err = stream_frames(&mut sink, 300).unwrap_err();
    assert!(err.is_transient(), "{err}");
    assert!(err.to_string().contains("timed out"), "{err}");
    assert!(started.elapsed() < Duration::from_secs(8));
}

#[cfg(unix)]
#[test]
fn encoder_exiting_mid_stream_reports_its_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let tools = fake_ffmpeg(
        dir.path(),
        "echo 'Unknown encoder libx264' >&2\nexit 1",
        Some(Duration::from_secs(30)),
    );
    let mut sink = FfmpegSink::new(tools, FfmpegSinkOpts::new(dir.path().join("out.mp4")));

    let err = stream_frames(&mut sink, 30).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Unknown encoder libx264"), "{msg}");
    assert!(msg.contains("exited with status"), "{msg}");
    assert!(!err.is_transient());
}

#[cfg(unix)]
#[test]
fn encoder_that_consumes_all_frames_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let tools = fake_ffmpeg(dir.path(), "cat > /dev/null", Some(Duration::from_secs(30)));
    let mut sink = FfmpegSink::new(tools, FfmpegSinkOpts::new(dir.path().join("out.mp4")));
    stream_frames(&mut sink, 10).unwrap();
}
