//! Normalizes any scene into a clip with the session's fixed stream parameters.
//!
//! Work is split in two so languages can share it:
//! - [`ClipBuilder::prepare_visual`] runs once per scene and does everything that does not depend
//!   on the narration language (image validation, stroke extraction, animation encoding, source
//!   video probing).
//! - [`ClipBuilder::build_clip`] runs once per scene and language and muxes the prepared visual
//!   with that language's audio into a normalized clip.
//!
//! Avatar scenes have no shared part: their video carries the per-language speech.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::animate::prepare_animation;
use crate::animate::reveal::{AnimationSpec, RevealStyle, StrokeStyle};
use crate::assets::color::HexColor;
use crate::assets::decode::{decode_image, decode_image_to_canvas};
use crate::assets::glyphs::GlyphRasterizer;
use crate::compose::retry::RetryPolicy;
use crate::compose::scratch::scene_stem;
use crate::encode::encoder::{AudioInput, Encoder, Fades, NormalizeJob, VisualInput};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{SketchError, SketchResult, Stage};
use crate::languages::LanguageTag;
use crate::scene::model::{MediaBlob, Scene, SceneKind};

pub const AVATAR_FADE_IN_SECS: f64 = 0.3;
pub const AVATAR_FADE_OUT_SECS: f64 = 0.4;

/// Letterbox fill behind illustrations.
const WHITEBOARD_FILL: HexColor = HexColor::WHITE;
/// Letterbox fill behind video sources.
const VIDEO_FILL: HexColor = HexColor::BLACK;

/// Look of animated whiteboard scenes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationSettings {
    pub style: RevealStyle,
    pub stroke: StrokeStyle,
    pub header_seconds: f64,
}

/// Language-independent visual of one scene, ready to be muxed.
#[derive(Clone, Debug, PartialEq)]
pub enum PreparedVisual {
    Shared {
        visual: VisualInput,
        letterbox: HexColor,
    },
    /// Resolved per language from the scene's avatar renders.
    PerLanguage,
}

/// One normalized scene clip in scratch storage.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedClip {
    pub scene_index: usize,
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Builds normalized clips through an [`Encoder`].
pub struct ClipBuilder<'a> {
    encoder: &'a dyn Encoder,
    rasterizer: &'a GlyphRasterizer,
    canvas: Canvas,
    fps: Fps,
    animation: AnimationSettings,
    retry: RetryPolicy,
}

impl<'a> ClipBuilder<'a> {
    pub fn new(
        encoder: &'a dyn Encoder,
        rasterizer: &'a GlyphRasterizer,
        canvas: Canvas,
        fps: Fps,
        animation: AnimationSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            encoder,
            rasterizer,
            canvas,
            fps,
            animation,
            retry,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Prepare the shared visual of scene `index` inside `scene_dir`.
    #[tracing::instrument(level = "info", skip_all, fields(scene = index, kind = scene.kind.name()))]
    pub fn prepare_visual(
        &self,
        index: usize,
        scene: &Scene,
        scene_dir: &Path,
    ) -> SketchResult<PreparedVisual> {
        let stem = scene_stem(index);
        let prepared = match &scene.kind {
            SceneKind::WhiteboardImage { image } => {
                decode_image(&image.bytes).map_err(|e| e.at_scene(Stage::Validation, index))?;
                let path = write_blob(scene_dir, &stem, "image", image, "png")
                    .map_err(|e| e.at_scene(Stage::Validation, index))?;
                PreparedVisual::Shared {
                    visual: VisualInput::StillImage(path),
                    letterbox: WHITEBOARD_FILL,
                }
            }
            SceneKind::WhiteboardAnimationSource { image, .. } => {
                let path = self.encode_animation(index, scene, image, scene_dir)?;
                PreparedVisual::Shared {
                    visual: VisualInput::Video(path),
                    letterbox: WHITEBOARD_FILL,
                }
            }
            SceneKind::Veo3Video { video } => {
                let path = write_blob(scene_dir, &stem, "source", video, "mp4")
                    .map_err(|e| e.at_scene(Stage::Validation, index))?;
                self.check_source(&path, false)
                    .map_err(|e| e.at_scene(Stage::Validation, index))?;
                PreparedVisual::Shared {
                    visual: VisualInput::Video(path),
                    letterbox: VIDEO_FILL,
                }
            }
            SceneKind::AvatarVideo { .. } => PreparedVisual::PerLanguage,
        };
        tracing::info!(scene = index, "scene visual prepared");
        Ok(prepared)
    }

    /// Mux `prepared` with the narration for `language` into `lang_dir/scene_NNN.mp4`.
    #[tracing::instrument(level = "info", skip_all, fields(scene = index, language = %language))]
    pub fn build_clip(
        &self,
        index: usize,
        scene: &Scene,
        prepared: &PreparedVisual,
        language: &LanguageTag,
        lang_dir: &Path,
    ) -> SketchResult<RenderedClip> {
        let stem = scene_stem(index);
        let lang = language.as_str();
        let at = |stage: Stage| move |e: SketchError| e.at_scene_language(stage, index, lang);

        let (visual, letterbox, audio, fades) = match (&scene.kind, prepared) {
            (SceneKind::AvatarVideo { .. }, _) => {
                let blob = scene.video_for(language).ok_or_else(|| {
                    SketchError::input("avatar scene without video").at_scene_language(
                        Stage::Validation,
                        index,
                        lang,
                    )
                })?;
                let path = write_blob(lang_dir, &stem, "avatar", blob, "mp4")
                    .map_err(at(Stage::Validation))?;
                self.check_source(&path, true).map_err(at(Stage::Validation))?;
                let fades = (scene.duration_secs > AVATAR_FADE_IN_SECS + AVATAR_FADE_OUT_SECS)
                    .then_some(Fades {
                        fade_in_secs: AVATAR_FADE_IN_SECS,
                        fade_out_secs: AVATAR_FADE_OUT_SECS,
                    });
                (VisualInput::Video(path), VIDEO_FILL, AudioInput::Embedded, fades)
            }
            (_, PreparedVisual::Shared { visual, letterbox }) => {
                let blob = scene.audio_for(language).ok_or_else(|| {
                    SketchError::input(format!("no narration audio for '{lang}'"))
                        .at_scene_language(Stage::Validation, index, lang)
                })?;
                if blob.is_empty() {
                    return Err(SketchError::input("narration audio is empty")
                        .at_scene_language(Stage::Validation, index, lang));
                }
                let path = write_blob(lang_dir, &stem, "audio", blob, "mp3")
                    .map_err(at(Stage::Validation))?;
                (visual.clone(), *letterbox, AudioInput::File(path), None)
            }
            (_, PreparedVisual::PerLanguage) => {
                return Err(SketchError::contract(format!(
                    "{} scene prepared as per-language visual",
                    scene.kind.name()
                ))
                .at_scene_language(Stage::Encoding, index, lang));
            }
        };

        let job = NormalizeJob {
            visual,
            audio,
            duration_secs: scene.duration_secs,
            canvas: self.canvas,
            fps: self.fps,
            letterbox,
            fades,
            out_path: lang_dir.join(format!("{stem}.mp4")),
        };
        self.retry
            .run("normalize clip", || self.encoder.normalize(&job))
            .map_err(at(Stage::Encoding))?;

        tracing::info!(scene = index, language = lang, "clip built");
        Ok(RenderedClip {
            scene_index: index,
            path: job.out_path,
            duration_secs: scene.duration_secs,
        })
    }

    fn encode_animation(
        &self,
        index: usize,
        scene: &Scene,
        image: &MediaBlob,
        scene_dir: &Path,
    ) -> SketchResult<PathBuf> {
        let raster = decode_image_to_canvas(&image.bytes, self.canvas)
            .map_err(|e| e.at_scene(Stage::Validation, index))?;
        let title = scene.animation_title().unwrap_or_default();

        let spec = AnimationSpec {
            canvas: self.canvas,
            fps: self.fps,
            duration_secs: scene.duration_secs,
            style: self.animation.style,
            stroke: self.animation.stroke,
        };
        let renderer = prepare_animation(
            spec,
            &raster,
            &title,
            self.animation.header_seconds,
            self.rasterizer,
        )
        .map_err(|e| e.at_scene(Stage::Extraction, index))?;
        if renderer.stroke_count() == 0 {
            tracing::debug!(scene = index, "no strokes extracted, header-only animation");
        }

        let out = scene_dir.join(format!("{}_animation.mp4", scene_stem(index)));
        let frames = self
            .retry
            .run("encode animation", || {
                let mut sink = self.encoder.frame_sink(&out)?;
                renderer.render_to_sink(sink.as_mut())
            })
            .map_err(|e| e.at_scene(Stage::Rendering, index))?;
        tracing::info!(
            scene = index,
            frames,
            strokes = renderer.stroke_count(),
            header = %title,
            "animation encoded"
        );
        Ok(out)
    }

    /// Fail fast on corrupt or empty source video. Probe failures on our own scratch copy of the
    /// caller's bytes are input errors unless the probe itself was transient.
    fn check_source(&self, path: &Path, needs_audio: bool) -> SketchResult<()> {
        let report = self.retry.run("probe source", || self.encoder.probe(path));
        let report = match report {
            Ok(r) => r,
            Err(e) if e.is_transient() => return Err(e),
            Err(e) => {
                return Err(SketchError::input(format!(
                    "source video '{}' is unreadable: {e}",
                    path.display()
                )));
            }
        };
        if !report.has_video {
            return Err(SketchError::input("source has no video stream"));
        }
        if needs_audio && !report.has_audio {
            return Err(SketchError::input("avatar video has no audio stream"));
        }
        if report.duration_secs.is_some_and(|d| d <= 0.0) {
            return Err(SketchError::input("source video has zero duration"));
        }
        Ok(())
    }
}

fn write_blob(
    dir: &Path,
    stem: &str,
    role: &str,
    blob: &MediaBlob,
    default_ext: &str,
) -> SketchResult<PathBuf> {
    if blob.is_empty() {
        return Err(SketchError::input(format!("{role} media is empty")));
    }
    let path = dir.join(blob.file_name(&format!("{stem}_{role}"), default_ext));
    std::fs::write(path.as_path(), blob.bytes.as_slice())
        .with_context(|| format!("write scratch media '{}'", path.display()))?;
    Ok(path)
}

#[cfg(test)]
#[path = "../../tests/unit/clip/builder.rs"]
mod tests;
