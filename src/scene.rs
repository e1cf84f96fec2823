//! Composition requests: ordered scenes, aspect ratio and target languages.

pub mod manifest;
pub mod model;

pub use model::{
    AspectRatio, CompositionRequest, LocalizedNarration, MediaBlob, Scene, SceneKind,
};
