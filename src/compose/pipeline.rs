//! Whole-request orchestration.
//!
//! 1. Validate the request and create its scratch directory.
//! 2. Prepare every scene's visual in parallel (stroke extraction, animation encoding).
//! 3. Build every (scene, language) clip in parallel.
//! 4. Per language, in parallel: caption track, then concatenation in scene order.
//!
//! Any failure aborts the request; the scratch directory is removed on every exit path.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rayon::prelude::*;
use serde::Serialize;

use crate::assets::glyphs::GlyphRasterizer;
use crate::captions::track::SubtitleTrack;
use crate::clip::builder::{AnimationSettings, ClipBuilder, PreparedVisual, RenderedClip};
use crate::compose::concat::Concatenator;
use crate::compose::opts::{CaptionDelivery, ComposeOpts};
use crate::compose::scratch::Scratch;
use crate::encode::encoder::Encoder;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{SketchError, SketchResult, Stage};
use crate::languages::LanguageTag;
use crate::scene::model::CompositionRequest;

/// Finished video and captions for one language.
#[derive(Clone, Debug, Serialize)]
pub struct LanguageDeliverable {
    pub language: LanguageTag,
    pub display_name: String,
    pub native_name: String,
    #[serde(skip)]
    pub video: Vec<u8>,
    /// Duration reported by the encoder for the finished file.
    pub duration_secs: Option<f64>,
    pub captions: SubtitleTrack,
    #[serde(skip)]
    pub srt: String,
    /// Whether the captions are also muxed into `video`.
    pub captions_embedded: bool,
}

/// One deliverable per requested language, in request order.
#[derive(Clone, Debug, Serialize)]
pub struct CompositionOutput {
    pub canvas: Canvas,
    pub fps: Fps,
    pub deliverables: Vec<LanguageDeliverable>,
}

impl CompositionOutput {
    pub fn deliverable(&self, language: &str) -> Option<&LanguageDeliverable> {
        let tag = LanguageTag::parse(language).ok()?;
        self.deliverables.iter().find(|d| d.language == tag)
    }

    /// Write `<lang>.mp4`, `<lang>.srt` and a `summary.json` into `dir`. Returns written paths.
    pub fn write_to_dir(&self, dir: &Path) -> SketchResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output directory '{}'", dir.display()))?;
        let mut written = Vec::new();
        for d in &self.deliverables {
            let video = dir.join(format!("{}.mp4", d.language));
            std::fs::write(&video, &d.video)
                .with_context(|| format!("write '{}'", video.display()))?;
            let srt = dir.join(format!("{}.srt", d.language));
            std::fs::write(&srt, &d.srt).with_context(|| format!("write '{}'", srt.display()))?;
            written.push(video);
            written.push(srt);
        }
        let summary = dir.join("summary.json");
        let json =
            serde_json::to_vec_pretty(self).map_err(|e| SketchError::serde(e.to_string()))?;
        std::fs::write(&summary, json)
            .with_context(|| format!("write '{}'", summary.display()))?;
        written.push(summary);
        Ok(written)
    }
}

/// Turns [`CompositionRequest`]s into per-language videos through an [`Encoder`].
///
/// Holds no per-request state; one composer can serve many requests.
pub struct Composer<'a> {
    encoder: &'a dyn Encoder,
    opts: ComposeOpts,
    rasterizer: GlyphRasterizer,
}

impl<'a> Composer<'a> {
    /// Composer with system fonts (plus `opts.font_dir`) for headers.
    pub fn new(encoder: &'a dyn Encoder, opts: ComposeOpts) -> SketchResult<Self> {
        let rasterizer = GlyphRasterizer::with_system_fonts(opts.font_dir.as_deref());
        Self::with_rasterizer(encoder, opts, rasterizer)
    }

    pub fn with_rasterizer(
        encoder: &'a dyn Encoder,
        opts: ComposeOpts,
        rasterizer: GlyphRasterizer,
    ) -> SketchResult<Self> {
        opts.validate()?;
        Ok(Self {
            encoder,
            opts,
            rasterizer,
        })
    }

    pub fn opts(&self) -> &ComposeOpts {
        &self.opts
    }

    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(aspect = %req.aspect_ratio, scenes = req.scenes.len(), languages = req.languages.len())
    )]
    pub fn compose(&self, req: &CompositionRequest) -> SketchResult<CompositionOutput> {
        let result = self.compose_inner(req);
        if let Err(e) = &result {
            tracing::error!(error = %e, "composition failed");
        }
        result
    }

    fn compose_inner(&self, req: &CompositionRequest) -> SketchResult<CompositionOutput> {
        let languages = req.validate()?;
        let canvas = req.canvas();
        let fps = Fps::OUTPUT;
        let scratch = Scratch::new(self.opts.scratch_root.as_deref())?;
        let pool = build_thread_pool(self.opts.threads)?;

        let builder = ClipBuilder::new(
            self.encoder,
            &self.rasterizer,
            canvas,
            fps,
            AnimationSettings {
                style: self.opts.style,
                stroke: self.opts.stroke,
                header_seconds: self.opts.header_seconds,
            },
            self.opts.retry,
        );

        let prepared: Vec<SketchResult<PreparedVisual>> = pool.install(|| {
            req.scenes
                .par_iter()
                .enumerate()
                .map(|(i, scene)| {
                    let dir = scratch
                        .scene_dir(i)
                        .map_err(|e| e.at_scene(Stage::Validation, i))?;
                    builder.prepare_visual(i, scene, &dir)
                })
                .collect()
        });
        let prepared = first_error(prepared)?;

        let lang_dirs = languages
            .iter()
            .map(|l| scratch.language_dir(l))
            .collect::<SketchResult<Vec<_>>>()?;

        let jobs: Vec<(usize, usize)> = (0..languages.len())
            .flat_map(|l| (0..req.scenes.len()).map(move |s| (l, s)))
            .collect();
        let built: Vec<SketchResult<RenderedClip>> = pool.install(|| {
            jobs.par_iter()
                .map(|&(l, s)| {
                    builder.build_clip(s, &req.scenes[s], &prepared[s], &languages[l], &lang_dirs[l])
                })
                .collect()
        });
        let built = first_error(built)?;
        // Indexed collection keeps job order: language-major, scene order within a language.
        let per_language: Vec<&[RenderedClip]> = built.chunks(req.scenes.len()).collect();

        let concatenator = Concatenator::new(self.encoder, self.opts.retry);
        let deliverables: Vec<SketchResult<LanguageDeliverable>> = pool.install(|| {
            languages
                .par_iter()
                .enumerate()
                .map(|(l, tag)| {
                    self.deliver(req, tag, per_language[l], &lang_dirs[l], &concatenator)
                })
                .collect()
        });
        let deliverables = first_error(deliverables)?;

        scratch.close();
        tracing::info!(
            languages = deliverables.len(),
            duration_secs = req.total_duration_secs(),
            "composition finished"
        );
        Ok(CompositionOutput {
            canvas,
            fps,
            deliverables,
        })
    }

    #[tracing::instrument(level = "info", skip_all, fields(language = %language))]
    fn deliver(
        &self,
        req: &CompositionRequest,
        language: &LanguageTag,
        clips: &[RenderedClip],
        lang_dir: &Path,
        concatenator: &Concatenator<'_>,
    ) -> SketchResult<LanguageDeliverable> {
        let lang = language.as_str();
        let captions = SubtitleTrack::for_request(req, language)
            .map_err(|e| e.at_language(Stage::Captions, lang))?;
        let srt = captions.to_srt();
        let srt_path = lang_dir.join("captions.srt");
        std::fs::write(&srt_path, &srt)
            .with_context(|| format!("write '{}'", srt_path.display()))
            .map_err(|e| SketchError::from(e).at_language(Stage::Captions, lang))?;

        let embed = self.opts.captions == CaptionDelivery::Embedded;
        let out_path = lang_dir.join("final.mp4");
        concatenator
            .concat(
                clips,
                language,
                embed.then_some(srt_path.as_path()),
                lang_dir,
                &out_path,
            )
            .map_err(|e| e.at_language(Stage::Concatenation, lang))?;

        let report = self
            .opts
            .retry
            .run("probe deliverable", || self.encoder.probe(&out_path))
            .map_err(|e| e.at_language(Stage::Concatenation, lang))?;
        let expected = captions.duration_secs();
        if let Some(actual) = report.duration_secs
            && (actual - expected).abs() > Fps::OUTPUT.frame_duration_secs() * 1.5
        {
            tracing::warn!(
                language = lang,
                expected,
                actual,
                "deliverable duration differs from scene total"
            );
        }

        let video = std::fs::read(&out_path)
            .with_context(|| format!("read '{}'", out_path.display()))
            .map_err(|e| SketchError::from(e).at_language(Stage::Concatenation, lang))?;
        tracing::info!(
            language = lang,
            name = %language.display_name(),
            bytes = video.len(),
            "deliverable ready"
        );
        Ok(LanguageDeliverable {
            language: language.clone(),
            display_name: language.display_name(),
            native_name: language.native_name(),
            video,
            duration_secs: report.duration_secs,
            captions,
            srt,
            captions_embedded: embed,
        })
    }
}

/// Unwrap per-item results, reporting the earliest failure in input order.
fn first_error<T>(items: Vec<SketchResult<T>>) -> SketchResult<Vec<T>> {
    items.into_iter().collect()
}

fn build_thread_pool(threads: Option<usize>) -> SketchResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(SketchError::input("compose 'threads' must be >= 1 when set"));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| SketchError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/compose/pipeline.rs"]
mod tests;
