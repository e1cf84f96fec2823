use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::animate::header::DEFAULT_HEADER_SECONDS;
use crate::animate::reveal::{RevealStyle, StrokeStyle};
use crate::compose::retry::RetryPolicy;
use crate::foundation::error::{SketchError, SketchResult};

/// How caption tracks are delivered with each video.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionDelivery {
    /// SRT returned next to the video only.
    #[default]
    Sidecar,
    /// SRT also muxed into the video as a soft subtitle stream.
    Embedded,
}

/// Options for one composition run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposeOpts {
    pub style: RevealStyle,
    pub stroke: StrokeStyle,
    /// Length of the header write-on in animated scenes.
    pub header_seconds: f64,
    /// Worker threads for per-scene work. `None` uses rayon defaults.
    pub threads: Option<usize>,
    pub captions: CaptionDelivery,
    /// Parent of the per-request scratch directory. `None` uses the system temp dir.
    pub scratch_root: Option<PathBuf>,
    /// Extra header fonts loaded on top of the system fonts.
    pub font_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
    /// Deadline for each encoder subprocess. `None` waits indefinitely.
    pub encoder_timeout_secs: Option<u64>,
}

impl Default for ComposeOpts {
    fn default() -> Self {
        Self {
            style: RevealStyle::default(),
            stroke: StrokeStyle::default(),
            header_seconds: DEFAULT_HEADER_SECONDS,
            threads: None,
            captions: CaptionDelivery::default(),
            scratch_root: None,
            font_dir: None,
            retry: RetryPolicy::default(),
            encoder_timeout_secs: Some(600),
        }
    }
}

impl ComposeOpts {
    pub fn from_json(bytes: &[u8]) -> SketchResult<Self> {
        let opts: Self = serde_json::from_slice(bytes)
            .map_err(|e| SketchError::serde(format!("compose options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn encoder_timeout(&self) -> Option<Duration> {
        self.encoder_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> SketchResult<()> {
        if !self.header_seconds.is_finite() || self.header_seconds < 0.0 {
            return Err(SketchError::input("header_seconds must be >= 0"));
        }
        if self.threads == Some(0) {
            return Err(SketchError::input("threads must be >= 1 when set"));
        }
        if !self.stroke.width.is_finite() || self.stroke.width <= 0.0 {
            return Err(SketchError::input("stroke width must be positive"));
        }
        if self.encoder_timeout_secs == Some(0) {
            return Err(SketchError::input("encoder_timeout_secs must be >= 1 when set"));
        }
        self.retry.validate()
    }
}
