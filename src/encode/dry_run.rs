//! An [`Encoder`] that writes small JSON descriptors instead of media.
//!
//! Useful for checking a composition end to end (ordering, durations, scratch layout, caption
//! timing) on machines without ffmpeg. Every file it produces is a [`DryRunMedia`] document, and
//! [`Encoder::probe`] reads those documents back.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::animate::raster::FrameRGBA;
use crate::encode::encoder::{
    AudioInput, ConcatJob, Encoder, NormalizeJob, ProbeReport, StreamParams,
};
use crate::encode::ffmpeg::{clip_stream_params, ensure_parent_dir};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{SketchError, SketchResult};

/// Contents of every file written by [`DryRunEncoder`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DryRunMedia {
    /// `animation`, `clip`, `concat` or `source`.
    pub kind: String,
    pub duration_secs: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
    pub params: StreamParams,
    #[serde(default)]
    pub frames: Option<u64>,
    /// Inputs of a concatenation, in order.
    #[serde(default)]
    pub clips: Vec<PathBuf>,
}

impl DryRunMedia {
    /// Descriptor standing in for a caller-supplied source video.
    pub fn source_video(duration_secs: f64, has_audio: bool) -> Self {
        Self {
            kind: "source".to_owned(),
            duration_secs: Some(duration_secs),
            has_video: true,
            has_audio,
            params: StreamParams::default(),
            frames: None,
            clips: Vec::new(),
        }
    }

    pub fn to_bytes(&self) -> SketchResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| SketchError::serde(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> SketchResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| SketchError::encoder(format!("unrecognized media: {e}")))
    }

    pub fn read(path: &Path) -> SketchResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read media '{}'", path.display()))?;
        Self::from_bytes(&bytes)
    }

    fn write(&self, path: &Path) -> SketchResult<()> {
        ensure_parent_dir(path)?;
        std::fs::write(path, self.to_bytes()?)
            .with_context(|| format!("write media '{}'", path.display()))?;
        Ok(())
    }
}

/// Records every job and writes [`DryRunMedia`] files.
#[derive(Debug, Default)]
pub struct DryRunEncoder {
    normalized: Mutex<Vec<NormalizeJob>>,
    concatenated: Mutex<Vec<ConcatJob>>,
}

impl DryRunEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize jobs in completion order.
    pub fn normalized(&self) -> Vec<NormalizeJob> {
        self.normalized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn concatenated(&self) -> Vec<ConcatJob> {
        self.concatenated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Encoder for DryRunEncoder {
    fn frame_sink(&self, out_path: &Path) -> SketchResult<Box<dyn FrameSink>> {
        Ok(Box::new(DryRunSink {
            out_path: out_path.to_path_buf(),
            cfg: None,
            frames: 0,
            last: None,
        }))
    }

    fn normalize(&self, job: &NormalizeJob) -> SketchResult<()> {
        if !job.duration_secs.is_finite() || job.duration_secs <= 0.0 {
            return Err(SketchError::input("clip duration must be positive"));
        }
        let visual = job.visual.path();
        if !visual.is_file() {
            return Err(SketchError::encoder(format!(
                "visual input '{}' does not exist",
                visual.display()
            )));
        }
        if let AudioInput::File(audio) = &job.audio
            && !audio.is_file()
        {
            return Err(SketchError::encoder(format!(
                "audio input '{}' does not exist",
                audio.display()
            )));
        }

        DryRunMedia {
            kind: "clip".to_owned(),
            duration_secs: Some(job.duration_secs),
            has_video: true,
            has_audio: true,
            params: clip_stream_params(job.canvas, job.fps),
            frames: Some(job.fps.secs_to_frames_ceil(job.duration_secs)),
            clips: Vec::new(),
        }
        .write(&job.out_path)?;
        tracing::debug!(out = %job.out_path.display(), "dry-run clip written");
        self.normalized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job.clone());
        Ok(())
    }

    fn concat(&self, job: &ConcatJob) -> SketchResult<()> {
        let first = job
            .clips
            .first()
            .ok_or_else(|| SketchError::input("nothing to concatenate"))?;
        let params = DryRunMedia::read(first)?.params;
        let mut duration = 0.0;
        for clip in &job.clips {
            duration += DryRunMedia::read(clip)?.duration_secs.unwrap_or(0.0);
        }
        DryRunMedia {
            kind: "concat".to_owned(),
            duration_secs: Some(duration),
            has_video: true,
            has_audio: true,
            params,
            frames: None,
            clips: job.clips.clone(),
        }
        .write(&job.out_path)?;
        self.concatenated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job.clone());
        Ok(())
    }

    fn probe(&self, path: &Path) -> SketchResult<ProbeReport> {
        let media = DryRunMedia::read(path)?;
        Ok(ProbeReport {
            duration_secs: media.duration_secs,
            has_video: media.has_video,
            has_audio: media.has_audio,
            params: media.params,
        })
    }
}

struct DryRunSink {
    out_path: PathBuf,
    cfg: Option<SinkConfig>,
    frames: u64,
    last: Option<FrameIndex>,
}

impl FrameSink for DryRunSink {
    fn begin(&mut self, cfg: SinkConfig) -> SketchResult<()> {
        self.cfg = Some(cfg);
        self.frames = 0;
        self.last = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SketchResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| SketchError::encoder("dry-run sink not started"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(SketchError::encoder("frame size does not match sink config"));
        }
        if self.last.is_some_and(|last| idx <= last) {
            return Err(SketchError::contract(format!(
                "frame {} pushed out of order",
                idx.0
            )));
        }
        self.last = Some(idx);
        self.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> SketchResult<()> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| SketchError::encoder("dry-run sink not started"))?;
        let canvas = Canvas {
            width: cfg.width,
            height: cfg.height,
        };
        let mut params = clip_stream_params(canvas, cfg.fps);
        params.audio_codec = None;
        params.sample_rate = None;
        params.channels = None;
        DryRunMedia {
            kind: "animation".to_owned(),
            duration_secs: Some(cfg.fps.frames_to_secs(self.frames)),
            has_video: true,
            has_audio: false,
            params,
            frames: Some(self.frames),
            clips: Vec::new(),
        }
        .write(&self.out_path)
    }
}
