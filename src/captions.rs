//! Time-aligned caption tracks built from scene durations.

pub mod track;

pub use track::{CaptionCue, SubtitleEntry, SubtitleTrack, build_track, srt_timestamp};
