//! The encoder port: everything the pipeline asks of an external video tool.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assets::color::HexColor;
use crate::encode::sink::FrameSink;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::SketchResult;

/// Stream-level parameters that must agree between clips for a stream-copy concatenation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamParams {
    pub video_codec: String,
    pub pixel_format: String,
    pub profile: Option<String>,
    pub level: Option<i64>,
    pub width: u32,
    pub height: u32,
    /// Frame rate as reported by the container, e.g. `30/1`.
    pub frame_rate: String,
    pub audio_codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
}

impl StreamParams {
    /// Names of the fields that differ from `other`, with both values.
    pub fn mismatches(&self, other: &StreamParams) -> Vec<String> {
        let mut out = Vec::new();
        let mut check = |name: &str, a: String, b: String| {
            if a != b {
                out.push(format!("{name}: {a} vs {b}"));
            }
        };
        check("video_codec", self.video_codec.clone(), other.video_codec.clone());
        check("pixel_format", self.pixel_format.clone(), other.pixel_format.clone());
        check("profile", format!("{:?}", self.profile), format!("{:?}", other.profile));
        check("level", format!("{:?}", self.level), format!("{:?}", other.level));
        check(
            "size",
            format!("{}x{}", self.width, self.height),
            format!("{}x{}", other.width, other.height),
        );
        check("frame_rate", self.frame_rate.clone(), other.frame_rate.clone());
        check(
            "audio_codec",
            format!("{:?}", self.audio_codec),
            format!("{:?}", other.audio_codec),
        );
        check(
            "sample_rate",
            format!("{:?}", self.sample_rate),
            format!("{:?}", other.sample_rate),
        );
        check(
            "channels",
            format!("{:?}", self.channels),
            format!("{:?}", other.channels),
        );
        out
    }
}

/// Result of probing a media file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub duration_secs: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
    pub params: StreamParams,
}

/// Visual content of a clip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VisualInput {
    /// A still image held for the whole clip.
    StillImage(PathBuf),
    /// A video; held on its last frame if shorter than the clip, cut if longer.
    Video(PathBuf),
}

impl VisualInput {
    pub fn path(&self) -> &Path {
        match self {
            VisualInput::StillImage(p) | VisualInput::Video(p) => p,
        }
    }
}

/// Where a clip's sound comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioInput {
    /// Separate narration file; padded with silence or cut to the clip duration.
    File(PathBuf),
    /// The audio track embedded in the visual input (avatar renders).
    Embedded,
}

/// Short fades at clip boundaries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fades {
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
}

/// One clip normalization: letterbox to `canvas`, resample to `fps`, cut to `duration_secs`.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizeJob {
    pub visual: VisualInput,
    pub audio: AudioInput,
    pub duration_secs: f64,
    pub canvas: Canvas,
    pub fps: Fps,
    /// Fill color of the letterbox bars.
    pub letterbox: HexColor,
    pub fades: Option<Fades>,
    pub out_path: PathBuf,
}

/// Stream-copy join of normalized clips, in list order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcatJob {
    pub clips: Vec<PathBuf>,
    /// Scratch file the demuxer list is written to.
    pub list_path: PathBuf,
    /// SRT muxed as a soft subtitle stream, when given.
    pub subtitles: Option<PathBuf>,
    /// ISO language tag recorded on the audio and subtitle streams.
    pub language: Option<String>,
    pub out_path: PathBuf,
}

/// Port over the external encoding tool.
///
/// Implementations must produce clips with identical stream parameters from every
/// [`NormalizeJob`], since [`Encoder::concat`] joins them without re-encoding.
pub trait Encoder: Send + Sync {
    /// Sink that encodes pushed frames into a silent video at `out_path`.
    fn frame_sink(&self, out_path: &Path) -> SketchResult<Box<dyn FrameSink>>;

    /// Build one normalized clip.
    fn normalize(&self, job: &NormalizeJob) -> SketchResult<()>;

    /// Join clips into one file.
    fn concat(&self, job: &ConcatJob) -> SketchResult<()>;

    /// Inspect a media file.
    fn probe(&self, path: &Path) -> SketchResult<ProbeReport>;
}
