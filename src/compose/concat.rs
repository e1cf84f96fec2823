//! Stream-copy concatenation of normalized clips.

use std::path::Path;

use crate::clip::builder::RenderedClip;
use crate::compose::retry::RetryPolicy;
use crate::encode::encoder::{ConcatJob, Encoder, StreamParams};
use crate::foundation::error::{SketchError, SketchResult};
use crate::languages::LanguageTag;

/// Joins one language's clips, in scene order, without re-encoding.
pub struct Concatenator<'a> {
    encoder: &'a dyn Encoder,
    retry: RetryPolicy,
}

impl<'a> Concatenator<'a> {
    pub fn new(encoder: &'a dyn Encoder, retry: RetryPolicy) -> Self {
        Self { encoder, retry }
    }

    /// Probe every clip and require identical stream parameters.
    ///
    /// Returns the shared parameters. A mismatch means a clip escaped normalization, which is a
    /// bug in clip building rather than bad input.
    pub fn verify_uniform(&self, clips: &[RenderedClip]) -> SketchResult<StreamParams> {
        let mut reference: Option<(usize, StreamParams)> = None;
        for clip in clips {
            let report = self
                .retry
                .run("probe clip", || self.encoder.probe(&clip.path))?;
            match &reference {
                None => reference = Some((clip.scene_index, report.params)),
                Some((first, params)) => {
                    let diff = params.mismatches(&report.params);
                    if !diff.is_empty() {
                        tracing::error!(
                            scene = clip.scene_index,
                            reference_scene = *first,
                            mismatches = ?diff,
                            "clip stream parameters differ"
                        );
                        return Err(SketchError::contract(format!(
                            "clip for scene {} differs from scene {first}: {}",
                            clip.scene_index,
                            diff.join(", ")
                        )));
                    }
                }
            }
        }
        reference
            .map(|(_, p)| p)
            .ok_or_else(|| SketchError::input("nothing to concatenate"))
    }

    /// Concatenate `clips` into `out_path`. Clips must be in strictly increasing scene order.
    #[tracing::instrument(level = "info", skip_all, fields(language = %language, clips = clips.len()))]
    pub fn concat(
        &self,
        clips: &[RenderedClip],
        language: &LanguageTag,
        subtitles: Option<&Path>,
        work_dir: &Path,
        out_path: &Path,
    ) -> SketchResult<()> {
        check_scene_order(clips)?;
        self.verify_uniform(clips)?;

        let job = ConcatJob {
            clips: clips.iter().map(|c| c.path.clone()).collect(),
            list_path: work_dir.join("concat.txt"),
            subtitles: subtitles.map(Path::to_path_buf),
            language: Some(language.base().to_owned()),
            out_path: out_path.to_path_buf(),
        };
        self.retry
            .run("concatenate", || self.encoder.concat(&job))?;
        tracing::info!(language = %language, out = %out_path.display(), "language concatenated");
        Ok(())
    }
}

fn check_scene_order(clips: &[RenderedClip]) -> SketchResult<()> {
    for pair in clips.windows(2) {
        if pair[1].scene_index <= pair[0].scene_index {
            tracing::error!(
                previous = pair[0].scene_index,
                next = pair[1].scene_index,
                "clips out of scene order"
            );
            return Err(SketchError::contract(format!(
                "clip for scene {} follows scene {}",
                pair[1].scene_index, pair[0].scene_index
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/compose/concat.rs"]
mod tests;
