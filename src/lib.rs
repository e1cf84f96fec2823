//! Sketchcast turns ink-on-paper illustrations into hand-drawn whiteboard animations and
//! composes narrated scenes into one finished video per language.
//!
//! - Extract strokes from an illustration ([`strokes`]) and render their progressive reveal,
//!   preceded by a written-on header ([`animate`]).
//! - Normalize every scene into a clip with uniform stream parameters ([`clip`]).
//! - Build caption tracks on a cumulative clock ([`captions`]) and join clips in scene order
//!   per language ([`compose`]).
//!
//! External encoding goes through the [`Encoder`] port; [`FfmpegEncoder`] is the production
//! implementation and [`DryRunEncoder`] writes JSON descriptors instead of media.
#![forbid(unsafe_code)]

mod foundation;

/// Image decoding, colors and header glyph rasterization.
pub mod assets;
/// Whiteboard animation frames.
pub mod animate;
pub mod captions;
pub mod clip;
pub mod compose;
/// Frame sinks and the encoder port.
pub mod encode;
pub mod languages;
pub mod scene;
pub mod strokes;

pub use crate::foundation::core::{Affine, BezPath, Canvas, Fps, FrameIndex, Point, Rgba8Premul};
pub use crate::foundation::error::{SketchError, SketchResult, Stage};

pub use crate::animate::{
    AnimationSpec, FrameRGBA, FrameRenderer, HeaderAnimator, RevealStyle, StrokeStyle,
    prepare_animation,
};
pub use crate::assets::{GlyphRasterizer, HexColor, RasterImage};
pub use crate::captions::{SubtitleEntry, SubtitleTrack};
pub use crate::clip::{ClipBuilder, RenderedClip};
pub use crate::compose::{
    CaptionDelivery, ComposeOpts, Composer, CompositionOutput, LanguageDeliverable, RetryPolicy,
};
pub use crate::encode::{
    DryRunEncoder, Encoder, FfmpegEncoder, FfmpegEncoderOpts, FrameSink, InMemorySink, SinkConfig,
};
pub use crate::languages::LanguageTag;
pub use crate::scene::{AspectRatio, CompositionRequest, MediaBlob, Scene, SceneKind};
pub use crate::strokes::{DrawingPath, PathPoint, extract_strokes};
