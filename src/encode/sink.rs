use crate::animate::raster::FrameRGBA;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{SketchError, SketchResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
}

/// Consumer of rendered frames.
///
/// Ordering contract: `push_frame` is called in strictly increasing [`FrameIndex`] order between
/// one `begin` and one `end`.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> SketchResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SketchResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> SketchResult<()>;
}

/// In-memory sink for tests and previews. Rejects out-of-order frames like the real encoders do.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> SketchResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SketchResult<()> {
        if self.cfg.is_none() {
            return Err(SketchError::render("in-memory sink not started"));
        }
        if let Some((last, _)) = self.frames.last()
            && idx.0 <= last.0
        {
            return Err(SketchError::render(
                "in-memory sink received out-of-order frame index",
            ));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> SketchResult<()> {
        self.finished = true;
        Ok(())
    }
}
