//! JSON manifests: a [`CompositionRequest`] whose media fields are file paths.
//!
//! ```json
//! {
//!   "aspect_ratio": "16:9",
//!   "languages": ["en", "es"],
//!   "scenes": [
//!     { "kind": "whiteboard_animation_source", "image": "s1.png", "header": "Cells",
//!       "audio": "s1.mp3", "caption": "Cells are small.", "duration": 5,
//!       "localized": { "es": { "audio": "s1_es.mp3", "caption": "Las células son pequeñas." } } }
//!   ]
//! }
//! ```
//!
//! Relative paths resolve against the manifest's directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{SketchError, SketchResult};
use crate::scene::model::{
    AspectRatio, CompositionRequest, LocalizedNarration, MediaBlob, Scene, SceneKind,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(alias = "aspectRatio", default)]
    pub aspect_ratio: AspectRatio,
    pub languages: Vec<String>,
    pub scenes: Vec<ManifestScene>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestScene {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "duration_secs")]
    pub duration: f64,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub audio: Option<PathBuf>,
    #[serde(flatten)]
    pub kind: ManifestKind,
    #[serde(default)]
    pub localized: BTreeMap<String, ManifestLocalized>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManifestKind {
    WhiteboardImage {
        image: PathBuf,
    },
    WhiteboardAnimationSource {
        image: PathBuf,
        #[serde(default)]
        header: Option<String>,
    },
    #[serde(alias = "veo3")]
    Veo3Video {
        video: PathBuf,
    },
    #[serde(alias = "avatar")]
    AvatarVideo {
        video: PathBuf,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestLocalized {
    pub audio: Option<PathBuf>,
    pub caption: Option<String>,
    pub video: Option<PathBuf>,
}

impl Manifest {
    pub fn from_json(bytes: &[u8]) -> SketchResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| SketchError::serde(format!("manifest: {e}")))
    }

    /// Load every referenced media file, resolving relative paths against `base_dir`.
    pub fn load(self, base_dir: &Path) -> SketchResult<CompositionRequest> {
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        };
        let load = |p: &Path| MediaBlob::from_path(&resolve(p));
        let load_opt = |p: &Option<PathBuf>| -> SketchResult<Option<MediaBlob>> {
            p.as_deref().map(load).transpose()
        };

        let mut scenes = Vec::with_capacity(self.scenes.len());
        for (i, s) in self.scenes.into_iter().enumerate() {
            let kind = match &s.kind {
                ManifestKind::WhiteboardImage { image } => SceneKind::WhiteboardImage {
                    image: load(image)?,
                },
                ManifestKind::WhiteboardAnimationSource { image, header } => {
                    SceneKind::WhiteboardAnimationSource {
                        image: load(image)?,
                        header: header.clone(),
                    }
                }
                ManifestKind::Veo3Video { video } => SceneKind::Veo3Video {
                    video: load(video)?,
                },
                ManifestKind::AvatarVideo { video } => SceneKind::AvatarVideo {
                    video: load(video)?,
                },
            };
            let mut localized = BTreeMap::new();
            for (lang, l) in &s.localized {
                localized.insert(
                    lang.clone(),
                    LocalizedNarration {
                        audio: load_opt(&l.audio)?,
                        caption: l.caption.clone(),
                        video: load_opt(&l.video)?,
                    },
                );
            }
            scenes.push(Scene {
                id: s.id.clone().unwrap_or_else(|| format!("scene-{}", i + 1)),
                duration_secs: s.duration,
                caption: s.caption.clone(),
                audio: load_opt(&s.audio)?,
                kind,
                localized,
            });
        }

        Ok(CompositionRequest {
            aspect_ratio: self.aspect_ratio,
            scenes,
            languages: self.languages,
        })
    }
}

impl CompositionRequest {
    /// Read a JSON manifest and the media it references.
    pub fn from_manifest_path(path: &Path) -> SketchResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read manifest '{}'", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let req = Manifest::from_json(&bytes)?.load(base)?;
        tracing::debug!(
            manifest = %path.display(),
            scenes = req.scenes.len(),
            languages = req.languages.len(),
            "manifest loaded"
        );
        Ok(req)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/manifest.rs"]
mod tests;
