//! Frame sinks and the external encoder port.

pub mod dry_run;
pub mod encoder;
pub mod ffmpeg;
pub mod process;
pub mod sink;

pub use dry_run::{DryRunEncoder, DryRunMedia};
pub use encoder::{
    AudioInput, ConcatJob, Encoder, Fades, NormalizeJob, ProbeReport, StreamParams, VisualInput,
};
pub use ffmpeg::{
    FfmpegEncoder, FfmpegEncoderOpts, FfmpegSink, FfmpegSinkOpts, clip_stream_params,
    ensure_parent_dir,
};
pub use sink::{FrameSink, InMemorySink, SinkConfig};
