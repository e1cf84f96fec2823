use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::animate::header::header_from_narration;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{SketchError, SketchResult};
use crate::languages::LanguageTag;

/// Output frame shape. Each ratio maps to one fixed pixel size for the whole request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn canvas(self) -> Canvas {
        match self {
            AspectRatio::Landscape => Canvas {
                width: 1920,
                height: 1080,
            },
            AspectRatio::Portrait => Canvas {
                width: 1080,
                height: 1920,
            },
            AspectRatio::Square => Canvas {
                width: 1024,
                height: 1024,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Portrait),
            "1:1" => Ok(AspectRatio::Square),
            other => Err(SketchError::input(format!(
                "unsupported aspect ratio '{other}' (expected 16:9, 9:16 or 1:1)"
            ))),
        }
    }
}

/// Raw media bytes owned by the caller, plus a file extension hint for the encoder.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Arc<Vec<u8>>,
    pub extension: Option<String>,
}

impl std::fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBlob")
            .field("len", &self.bytes.len())
            .field("extension", &self.extension)
            .finish()
    }
}

impl MediaBlob {
    pub fn new(bytes: Vec<u8>, extension: Option<&str>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            extension: extension.map(|e| e.trim_start_matches('.').to_ascii_lowercase()),
        }
    }

    pub fn from_path(path: &Path) -> SketchResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read media file '{}'", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str());
        Ok(Self::new(bytes, ext))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Scratch file name for this blob: `stem.ext`, falling back to `default_ext`.
    pub fn file_name(&self, stem: &str, default_ext: &str) -> String {
        format!("{stem}.{}", self.extension.as_deref().unwrap_or(default_ext))
    }
}

/// Per-language replacements for a scene's narration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalizedNarration {
    pub audio: Option<MediaBlob>,
    pub caption: Option<String>,
    /// Per-language render of an avatar scene.
    pub video: Option<MediaBlob>,
}

/// Visual source of a scene.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneKind {
    /// Still illustration held for the whole scene.
    WhiteboardImage { image: MediaBlob },
    /// Illustration drawn stroke by stroke after an optional header write-on.
    ///
    /// `header: None` derives the title from the default caption; `Some("")` disables the
    /// header. The animation is rendered once and shared by every language, so localized
    /// captions never change the title.
    WhiteboardAnimationSource {
        image: MediaBlob,
        header: Option<String>,
    },
    /// Externally generated clip, narrated by the scene audio.
    Veo3Video { video: MediaBlob },
    /// Talking-head render with its own speech track.
    AvatarVideo { video: MediaBlob },
}

impl SceneKind {
    pub fn name(&self) -> &'static str {
        match self {
            SceneKind::WhiteboardImage { .. } => "whiteboard_image",
            SceneKind::WhiteboardAnimationSource { .. } => "whiteboard_animation_source",
            SceneKind::Veo3Video { .. } => "veo3_video",
            SceneKind::AvatarVideo { .. } => "avatar_video",
        }
    }

    /// Whether the visual source carries the scene's sound.
    pub fn has_embedded_audio(&self) -> bool {
        matches!(self, SceneKind::AvatarVideo { .. })
    }
}

/// One scene of a composition.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub id: String,
    pub duration_secs: f64,
    pub caption: Option<String>,
    /// Default narration; required unless the scene has embedded audio.
    pub audio: Option<MediaBlob>,
    pub kind: SceneKind,
    /// Overrides keyed by language code (`es` also serves `es-MX`).
    pub localized: BTreeMap<String, LocalizedNarration>,
}

impl Scene {
    pub fn new(id: impl Into<String>, duration_secs: f64, kind: SceneKind) -> Self {
        Self {
            id: id.into(),
            duration_secs,
            caption: None,
            audio: None,
            kind,
            localized: BTreeMap::new(),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_audio(mut self, audio: MediaBlob) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_localized(mut self, language: &str, narration: LocalizedNarration) -> Self {
        self.localized.insert(language.to_owned(), narration);
        self
    }

    fn localized_for(&self, language: &LanguageTag) -> Option<&LocalizedNarration> {
        let parsed: Vec<(LanguageTag, &LocalizedNarration)> = self
            .localized
            .iter()
            .filter_map(|(k, v)| LanguageTag::parse(k).ok().map(|t| (t, v)))
            .collect();
        parsed
            .iter()
            .find(|(t, _)| t == language)
            .or_else(|| parsed.iter().find(|(t, _)| t.as_str() == language.base()))
            .map(|(_, v)| *v)
    }

    /// Header title of an animated scene, or `None` for other kinds. Derived from the default
    /// caption when no explicit header is set, independent of the target language.
    pub fn animation_title(&self) -> Option<String> {
        match &self.kind {
            SceneKind::WhiteboardAnimationSource { header, .. } => Some(match header {
                Some(h) => h.trim().to_owned(),
                None => header_from_narration(self.caption.as_deref().unwrap_or_default()),
            }),
            _ => None,
        }
    }

    /// Caption in `language`, falling back to the default caption.
    pub fn caption_for(&self, language: &LanguageTag) -> Option<&str> {
        self.localized_for(language)
            .and_then(|l| l.caption.as_deref())
            .or(self.caption.as_deref())
            .filter(|c| !c.trim().is_empty())
    }

    /// Narration in `language`, falling back to the default audio.
    pub fn audio_for(&self, language: &LanguageTag) -> Option<&MediaBlob> {
        self.localized_for(language)
            .and_then(|l| l.audio.as_ref())
            .or(self.audio.as_ref())
    }

    /// Visual video in `language`. Only avatar scenes have per-language renders.
    pub fn video_for(&self, language: &LanguageTag) -> Option<&MediaBlob> {
        match &self.kind {
            SceneKind::AvatarVideo { video } => Some(
                self.localized_for(language)
                    .and_then(|l| l.video.as_ref())
                    .unwrap_or(video),
            ),
            SceneKind::Veo3Video { video } => Some(video),
            SceneKind::WhiteboardImage { .. } | SceneKind::WhiteboardAnimationSource { .. } => {
                None
            }
        }
    }

    /// Check durations, media presence and the one-audio-source rule for every language.
    pub fn validate(&self, languages: &[LanguageTag]) -> SketchResult<()> {
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(SketchError::input(format!(
                "scene '{}' duration must be positive, got {}",
                self.id, self.duration_secs
            )));
        }
        let min_secs = Fps::OUTPUT.frames_to_secs(1);
        if self.duration_secs < min_secs {
            return Err(SketchError::input(format!(
                "scene '{}' duration {}s is shorter than one frame ({min_secs:.4}s)",
                self.id, self.duration_secs
            )));
        }

        let visual = match &self.kind {
            SceneKind::WhiteboardImage { image }
            | SceneKind::WhiteboardAnimationSource { image, .. } => image,
            SceneKind::Veo3Video { video } | SceneKind::AvatarVideo { video } => video,
        };
        if visual.is_empty() {
            return Err(SketchError::input(format!(
                "scene '{}' ({}) has empty media",
                self.id,
                self.kind.name()
            )));
        }

        for key in self.localized.keys() {
            LanguageTag::parse(key)?;
        }

        if self.kind.has_embedded_audio() {
            if self.audio.is_some() || self.localized.values().any(|l| l.audio.is_some()) {
                return Err(SketchError::input(format!(
                    "scene '{}' is an avatar video and carries its own audio",
                    self.id
                )));
            }
        } else if self.localized.values().any(|l| l.video.is_some()) {
            return Err(SketchError::input(format!(
                "scene '{}' ({}) cannot have per-language video",
                self.id,
                self.kind.name()
            )));
        }

        for lang in languages {
            if let Some(video) = self.video_for(lang)
                && video.is_empty()
            {
                return Err(SketchError::input(format!(
                    "scene '{}' has empty video for '{lang}'",
                    self.id
                )));
            }
            if self.kind.has_embedded_audio() {
                continue;
            }
            match self.audio_for(lang) {
                None => {
                    return Err(SketchError::input(format!(
                        "scene '{}' has no narration audio for '{lang}'",
                        self.id
                    )));
                }
                Some(a) if a.is_empty() => {
                    return Err(SketchError::input(format!(
                        "scene '{}' has empty narration audio for '{lang}'",
                        self.id
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Everything needed to produce one video per language.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionRequest {
    pub aspect_ratio: AspectRatio,
    /// Final temporal order; never reordered.
    pub scenes: Vec<Scene>,
    pub languages: Vec<String>,
}

impl CompositionRequest {
    pub fn canvas(&self) -> Canvas {
        self.aspect_ratio.canvas()
    }

    /// Sum of the declared scene durations.
    pub fn total_duration_secs(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration_secs).sum()
    }

    /// Parsed, normalized language tags; rejects malformed codes and duplicates.
    pub fn language_tags(&self) -> SketchResult<Vec<LanguageTag>> {
        if self.languages.is_empty() {
            return Err(SketchError::input("at least one language is required"));
        }
        let mut tags: Vec<LanguageTag> = Vec::with_capacity(self.languages.len());
        for code in &self.languages {
            let tag = LanguageTag::parse(code)?;
            if tags.contains(&tag) {
                return Err(SketchError::input(format!("language '{tag}' requested twice")));
            }
            tags.push(tag);
        }
        Ok(tags)
    }

    /// Validate the whole request. Scene failures are attributed to the scene index.
    pub fn validate(&self) -> SketchResult<Vec<LanguageTag>> {
        if self.scenes.is_empty() {
            return Err(SketchError::input("composition has no scenes"));
        }
        let tags = self.language_tags()?;
        for (i, scene) in self.scenes.iter().enumerate() {
            scene
                .validate(&tags)
                .map_err(|e| e.at_scene(crate::foundation::error::Stage::Validation, i))?;
        }
        Ok(tags)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
