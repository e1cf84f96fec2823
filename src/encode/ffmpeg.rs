use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::animate::raster::FrameRGBA;
use crate::encode::encoder::{
    AudioInput, ConcatJob, Encoder, NormalizeJob, ProbeReport, StreamParams, VisualInput,
};
use crate::encode::process::{Supervised, check_status, run_checked};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{SketchError, SketchResult};
use crate::foundation::math::mul_div255_u16;

/// Environment variable overriding the `ffmpeg` binary.
pub const FFMPEG_PATH_ENV: &str = "FFMPEG_PATH";
/// Environment variable overriding the `ffprobe` binary.
pub const FFPROBE_PATH_ENV: &str = "FFPROBE_PATH";

/// Audio sample rate of every clip.
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Where to find the tools and how long any single invocation may run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegEncoderOpts {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub timeout: Option<Duration>,
}

impl Default for FfmpegEncoderOpts {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            timeout: None,
        }
    }
}

impl FfmpegEncoderOpts {
    /// Honor `FFMPEG_PATH` / `FFPROBE_PATH`, falling back to `PATH` lookup.
    pub fn from_env() -> Self {
        let pick = |var: &str, default: &str| {
            std::env::var_os(var)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };
        Self {
            ffmpeg: pick(FFMPEG_PATH_ENV, "ffmpeg"),
            ffprobe: pick(FFPROBE_PATH_ENV, "ffprobe"),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Return `true` when both `ffmpeg` and `ffprobe` can be invoked.
    pub fn tools_available(&self) -> bool {
        [&self.ffmpeg, &self.ffprobe].iter().all(|bin| {
            Command::new(bin)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        })
    }
}

/// Video/audio codec settings shared by every clip, so clips can be joined by stream copy.
pub fn clip_codec_args(fps: Fps) -> Vec<String> {
    [
        "-c:v", "libx264", "-profile:v", "high", "-level:v", "4.2", "-pix_fmt", "yuv420p", "-g",
        "60", "-bf", "0", "-crf", "20", "-preset", "veryfast",
    ]
    .iter()
    .map(|s| (*s).to_owned())
    .chain([
        "-r".to_owned(),
        format!("{}/{}", fps.num, fps.den),
        "-fps_mode".to_owned(),
        "cfr".to_owned(),
    ])
    .collect()
}

fn audio_codec_args() -> Vec<String> {
    vec![
        "-c:a".to_owned(),
        "aac".to_owned(),
        "-ar".to_owned(),
        AUDIO_SAMPLE_RATE.to_string(),
        "-ac".to_owned(),
        "2".to_owned(),
        "-b:a".to_owned(),
        "160k".to_owned(),
    ]
}

/// Stream parameters `ffprobe` reports for a clip built with [`clip_codec_args`] and
/// [`audio_codec_args`].
pub fn clip_stream_params(canvas: Canvas, fps: Fps) -> StreamParams {
    StreamParams {
        video_codec: "h264".to_owned(),
        pixel_format: "yuv420p".to_owned(),
        profile: Some("High".to_owned()),
        level: Some(42),
        width: canvas.width,
        height: canvas.height,
        frame_rate: format!("{}/{}", fps.num, fps.den),
        audio_codec: Some("aac".to_owned()),
        sample_rate: Some(AUDIO_SAMPLE_RATE),
        channels: Some(2),
    }
}

/// `ffmpeg` invocation for one [`NormalizeJob`], without the program name.
pub fn normalize_args(job: &NormalizeJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
        .iter()
        .map(OsString::from)
        .collect();
    let fps = format!("{}/{}", job.fps.num, job.fps.den);

    match &job.visual {
        VisualInput::StillImage(path) => {
            args.extend(["-loop", "1", "-framerate", fps.as_str()].map(OsString::from));
            args.push("-i".into());
            args.push(path.into());
        }
        VisualInput::Video(path) => {
            args.push("-i".into());
            args.push(path.into());
        }
    }
    let audio_label = match &job.audio {
        AudioInput::File(path) => {
            args.push("-i".into());
            args.push(path.into());
            "1:a"
        }
        AudioInput::Embedded => "0:a",
    };

    let (w, h) = (job.canvas.width, job.canvas.height);
    let d = job.duration_secs;
    let mut video = format!(
        "[0:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color={},setsar=1,fps={fps}",
        job.letterbox.to_ffmpeg()
    );
    if matches!(job.visual, VisualInput::Video(_)) {
        video.push_str(&format!(",tpad=stop_mode=clone:stop_duration={d:.3}"));
    }
    if let Some(f) = job.fades {
        video.push_str(&format!(
            ",fade=t=in:st=0:d={:.3},fade=t=out:st={:.3}:d={:.3}",
            f.fade_in_secs,
            (d - f.fade_out_secs).max(0.0),
            f.fade_out_secs
        ));
    }
    video.push_str(",format=yuv420p[v]");
    let audio = format!(
        "[{audio_label}]aresample={AUDIO_SAMPLE_RATE},aformat=channel_layouts=stereo,apad[a]"
    );

    args.push("-filter_complex".into());
    args.push(format!("{video};{audio}").into());
    args.extend(["-map", "[v]", "-map", "[a]"].map(OsString::from));
    args.extend(clip_codec_args(job.fps).into_iter().map(OsString::from));
    args.extend(audio_codec_args().into_iter().map(OsString::from));
    args.push("-t".into());
    args.push(format!("{d:.3}").into());
    args.extend(["-movflags", "+faststart"].map(OsString::from));
    args.push(job.out_path.as_os_str().to_owned());
    args
}

/// Demuxer list for `ffmpeg -f concat`, one escaped `file` line per clip.
pub fn concat_list(clips: &[PathBuf]) -> String {
    let mut contents = String::with_capacity(24 * clips.len());
    for clip in clips {
        let fixed = clip
            .display()
            .to_string()
            .replace('\\', r"\\")
            .replace(' ', r"\ ")
            .replace('\'', r"\'");
        contents.push_str("file ");
        contents.push_str(&fixed);
        contents.push('\n');
    }
    contents
}

/// `ffmpeg` invocation for one [`ConcatJob`], without the program name.
pub fn concat_args(job: &ConcatJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(job.list_path.as_os_str().to_owned());
    if let Some(srt) = &job.subtitles {
        args.push("-i".into());
        args.push(srt.into());
    }
    args.extend(["-map", "0:v", "-map", "0:a"].map(OsString::from));
    if job.subtitles.is_some() {
        args.extend(["-map", "1:s", "-c:s", "mov_text"].map(OsString::from));
    }
    args.extend(["-c:v", "copy", "-c:a", "copy"].map(OsString::from));

    if let Some(lang) = job.language.as_deref() {
        let base = lang.split('-').next().unwrap_or(lang);
        args.push("-metadata:s:a:0".into());
        args.push(format!("language={base}").into());
        if job.subtitles.is_some() {
            args.push("-metadata:s:s:0".into());
            args.push(format!("language={base}").into());
        }
    }
    args.extend(["-movflags", "+faststart"].map(OsString::from));
    args.push(job.out_path.as_os_str().to_owned());
    args
}

/// [`Encoder`] backed by the system `ffmpeg` / `ffprobe` binaries.
#[derive(Clone, Debug, Default)]
pub struct FfmpegEncoder {
    opts: FfmpegEncoderOpts,
}

impl FfmpegEncoder {
    pub fn new(opts: FfmpegEncoderOpts) -> Self {
        Self { opts }
    }

    pub fn opts(&self) -> &FfmpegEncoderOpts {
        &self.opts
    }

    fn ffmpeg(&self) -> Command {
        Command::new(&self.opts.ffmpeg)
    }
}

impl Encoder for FfmpegEncoder {
    fn frame_sink(&self, out_path: &Path) -> SketchResult<Box<dyn FrameSink>> {
        Ok(Box::new(FfmpegSink::new(
            self.opts.clone(),
            FfmpegSinkOpts::new(out_path),
        )))
    }

    fn normalize(&self, job: &NormalizeJob) -> SketchResult<()> {
        if !job.duration_secs.is_finite() || job.duration_secs <= 0.0 {
            return Err(SketchError::input("clip duration must be positive"));
        }
        ensure_parent_dir(&job.out_path)?;
        let mut cmd = self.ffmpeg();
        cmd.args(normalize_args(job));
        run_checked(&mut cmd, "ffmpeg", self.opts.timeout)?;
        Ok(())
    }

    fn concat(&self, job: &ConcatJob) -> SketchResult<()> {
        if job.clips.is_empty() {
            return Err(SketchError::input("nothing to concatenate"));
        }
        ensure_parent_dir(&job.list_path)?;
        ensure_parent_dir(&job.out_path)?;
        std::fs::write(&job.list_path, concat_list(&job.clips)).with_context(|| {
            format!("write concat list '{}'", job.list_path.display())
        })?;
        let mut cmd = self.ffmpeg();
        cmd.args(concat_args(job));
        run_checked(&mut cmd, "ffmpeg", self.opts.timeout)?;
        Ok(())
    }

    fn probe(&self, path: &Path) -> SketchResult<ProbeReport> {
        let mut cmd = Command::new(&self.opts.ffprobe);
        cmd.args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path);
        let out = run_checked(&mut cmd, "ffprobe", self.opts.timeout)?;
        parse_probe_json(&out.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeJson {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    profile: Option<String>,
    level: Option<i64>,
    pix_fmt: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_json(bytes: &[u8]) -> SketchResult<ProbeReport> {
    let parsed: ProbeJson = serde_json::from_slice(bytes)
        .map_err(|e| SketchError::serde(format!("ffprobe json: {e}")))?;

    let kind = |k: &str| {
        parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(k))
    };
    let video = kind("video");
    let audio = kind("audio");

    let mut params = StreamParams::default();
    if let Some(v) = video {
        params.video_codec = v.codec_name.clone().unwrap_or_default();
        params.pixel_format = v.pix_fmt.clone().unwrap_or_default();
        params.profile = v.profile.clone();
        params.level = v.level;
        params.width = v.width.unwrap_or(0);
        params.height = v.height.unwrap_or(0);
        params.frame_rate = v.r_frame_rate.clone().unwrap_or_default();
    }
    if let Some(a) = audio {
        params.audio_codec = a.codec_name.clone();
        params.sample_rate = a.sample_rate.as_deref().and_then(|s| s.parse().ok());
        params.channels = a.channels;
    }

    Ok(ProbeReport {
        duration_secs: parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|d| d.parse().ok()),
        has_video: video.is_some(),
        has_audio: audio.is_some(),
        params,
    })
}

/// Options for [`FfmpegSink`] output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Background used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Options for a silent MP4 at `out_path`, flattened over white paper.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            bg_rgba: [255, 255, 255, 255],
        }
    }
}

/// Sink that streams raw frames into `ffmpeg` stdin.
pub struct FfmpegSink {
    tools: FfmpegEncoderOpts,
    opts: FfmpegSinkOpts,
    child: Option<Supervised>,
    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    pub fn new(tools: FfmpegEncoderOpts, opts: FfmpegSinkOpts) -> Self {
        Self {
            tools,
            opts,
            child: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> SketchResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(SketchError::input("ffmpeg sink width/height must be non-zero"));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(SketchError::input(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        ensure_parent_dir(&self.opts.out_path)?;

        let mut cmd = Command::new(&self.tools.ffmpeg);
        cmd.args([
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i",
            "pipe:0",
            "-an",
        ])
        .args(clip_codec_args(cfg.fps))
        .args(["-movflags", "+faststart"])
        .arg(&self.opts.out_path);

        self.child = Some(Supervised::spawn(
            &mut cmd,
            "ffmpeg",
            true,
            self.tools.timeout,
        )?);
        self.scratch = vec![0u8; cfg.width as usize * cfg.height as usize * 4];
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SketchResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SketchError::encoder("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(SketchError::contract(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(SketchError::render(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(child) = self.child.as_mut() else {
            return Err(SketchError::encoder("ffmpeg sink is already finalized"));
        };
        let buf = std::mem::take(&mut self.scratch);
        match child.write_stdin(buf) {
            Ok(buf) => {
                self.scratch = buf;
                Ok(())
            }
            Err(e) => {
                self.child = None;
                self.cfg = None;
                Err(e)
            }
        }
    }

    fn end(&mut self) -> SketchResult<()> {
        let child = self
            .child
            .take()
            .ok_or_else(|| SketchError::encoder("ffmpeg sink not started"))?;
        let out = child.wait()?;
        check_status("ffmpeg", &out)?;
        self.cfg = None;
        Ok(())
    }
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> SketchResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(SketchError::render(
            "frame data size mismatch with width*height*4",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> SketchResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
