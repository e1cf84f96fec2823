//! Per-scene clip assembly.

pub mod builder;

pub use builder::{
    AVATAR_FADE_IN_SECS, AVATAR_FADE_OUT_SECS, AnimationSettings, ClipBuilder, PreparedVisual,
    RenderedClip,
};
