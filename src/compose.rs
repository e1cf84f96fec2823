//! Composition of per-language deliverables from a request.

pub mod concat;
pub mod opts;
pub mod pipeline;
pub mod retry;
pub mod scratch;

pub use concat::Concatenator;
pub use opts::{CaptionDelivery, ComposeOpts};
pub use pipeline::{Composer, CompositionOutput, LanguageDeliverable};
pub use retry::RetryPolicy;
pub use scratch::Scratch;
