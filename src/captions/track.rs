use std::fmt::Write as _;

use serde::Serialize;

use crate::foundation::error::{SketchError, SketchResult};
use crate::languages::LanguageTag;
use crate::scene::model::CompositionRequest;

/// One scene's contribution to a caption track.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionCue<'a> {
    pub text: Option<&'a str>,
    pub duration_secs: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubtitleEntry {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Captions for one language; entries are contiguous and never overlap.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubtitleTrack {
    pub language: String,
    pub entries: Vec<SubtitleEntry>,
}

/// Run a cumulative clock over `cues`: cue `i` starts where cue `i - 1` ended.
///
/// Missing or blank text becomes `Scene N` (1-based).
pub fn build_track(language: &LanguageTag, cues: &[CaptionCue<'_>]) -> SketchResult<SubtitleTrack> {
    let mut clock = 0.0f64;
    let mut entries = Vec::with_capacity(cues.len());
    for (i, cue) in cues.iter().enumerate() {
        if !cue.duration_secs.is_finite() || cue.duration_secs <= 0.0 {
            return Err(SketchError::input(format!(
                "caption {} has non-positive duration {}",
                i + 1,
                cue.duration_secs
            )));
        }
        let start = clock;
        clock += cue.duration_secs;
        let text = cue
            .text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("Scene {}", i + 1));
        entries.push(SubtitleEntry {
            start_secs: start,
            end_secs: clock,
            text,
        });
    }
    Ok(SubtitleTrack {
        language: language.to_string(),
        entries,
    })
}

impl SubtitleTrack {
    /// Track for `language` from the request's scenes, using localized captions where present.
    pub fn for_request(req: &CompositionRequest, language: &LanguageTag) -> SketchResult<Self> {
        let cues: Vec<CaptionCue<'_>> = req
            .scenes
            .iter()
            .map(|s| CaptionCue {
                text: s.caption_for(language),
                duration_secs: s.duration_secs,
            })
            .collect();
        build_track(language, &cues)
    }

    pub fn duration_secs(&self) -> f64 {
        self.entries.last().map(|e| e.end_secs).unwrap_or(0.0)
    }

    /// SubRip text: numbered cues with `HH:MM:SS,mmm --> HH:MM:SS,mmm` ranges.
    pub fn to_srt(&self) -> String {
        let mut out = String::new();
        for (i, e) in self.entries.iter().enumerate() {
            let _ = writeln!(out, "{}", i + 1);
            let _ = writeln!(
                out,
                "{} --> {}",
                srt_timestamp(e.start_secs),
                srt_timestamp(e.end_secs)
            );
            for line in e.text.lines() {
                let _ = writeln!(out, "{line}");
            }
            out.push('\n');
        }
        out
    }
}

/// `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn srt_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let s = (total_ms / 1000) % 60;
    let m = (total_ms / 60_000) % 60;
    let h = total_ms / 3_600_000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

#[cfg(test)]
#[path = "../../tests/unit/captions/track.rs"]
mod tests;
