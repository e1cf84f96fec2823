/// Convenience result type used across sketchcast.
pub type SketchResult<T> = Result<T, SketchError>;

/// Pipeline stage reported alongside a failing scene or language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Request/scene validation and media decoding.
    Validation,
    /// Stroke extraction from the illustration.
    Extraction,
    /// Frame rendering of the whiteboard animation.
    Rendering,
    /// Per-scene clip encoding.
    Encoding,
    /// Caption track generation.
    Captions,
    /// Final per-language concatenation.
    Concatenation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Validation => "validation",
            Stage::Extraction => "extraction",
            Stage::Rendering => "rendering",
            Stage::Encoding => "encoding",
            Stage::Captions => "captions",
            Stage::Concatenation => "concatenation",
        };
        f.write_str(s)
    }
}

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum SketchError {
    /// Malformed, empty or corrupt scene media, or invalid request data.
    #[error("input error: {0}")]
    Input(String),

    /// Errors while rasterizing frames.
    #[error("render error: {0}")]
    Render(String),

    /// The external encoder failed, timed out or could not be started.
    #[error("encoder error: {message}")]
    Encoder {
        /// Human readable failure, usually including encoder stderr.
        message: String,
        /// Whether a retry could plausibly succeed (timeouts, resource exhaustion).
        transient: bool,
    },

    /// Internal invariant broken between pipeline stages (for example mismatched clip parameters).
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// A failure attributed to one stage of one scene and/or language.
    #[error("{stage} failed{}{}: {source}", scene_suffix(*.scene), language_suffix(.language.as_deref()))]
    Stage {
        /// Stage that failed.
        stage: Stage,
        /// Zero-based scene index, when the failure belongs to one scene.
        scene: Option<usize>,
        /// Language code, when the failure belongs to one language.
        language: Option<String>,
        /// Underlying failure.
        #[source]
        source: Box<SketchError>,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn scene_suffix(scene: Option<usize>) -> String {
    scene.map(|i| format!(" for scene {i}")).unwrap_or_default()
}

fn language_suffix(language: Option<&str>) -> String {
    language
        .map(|l| format!(" (language '{l}')"))
        .unwrap_or_default()
}

impl SketchError {
    /// Build a [`SketchError::Input`] value.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Build a [`SketchError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a terminal [`SketchError::Encoder`] value.
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder {
            message: msg.into(),
            transient: false,
        }
    }

    /// Build a retryable [`SketchError::Encoder`] value.
    pub fn encoder_transient(msg: impl Into<String>) -> Self {
        Self::Encoder {
            message: msg.into(),
            transient: true,
        }
    }

    /// Build a [`SketchError::ContractViolation`] value.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }

    /// Build a [`SketchError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Attribute this error to `stage` of scene `scene`.
    pub fn at_scene(self, stage: Stage, scene: usize) -> Self {
        Self::Stage {
            stage,
            scene: Some(scene),
            language: None,
            source: Box::new(self),
        }
    }

    /// Attribute this error to `stage` of scene `scene` rendered for `language`.
    pub fn at_scene_language(self, stage: Stage, scene: usize, language: &str) -> Self {
        Self::Stage {
            stage,
            scene: Some(scene),
            language: Some(language.to_owned()),
            source: Box::new(self),
        }
    }

    /// Attribute this error to `stage` of the deliverable for `language`.
    pub fn at_language(self, stage: Stage, language: &str) -> Self {
        Self::Stage {
            stage,
            scene: None,
            language: Some(language.to_owned()),
            source: Box::new(self),
        }
    }

    /// Whether the failure is worth retrying under a retry policy.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Encoder { transient, .. } => *transient,
            Self::Stage { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Failing stage and scene index, if this error was attributed.
    pub fn location(&self) -> Option<(Stage, Option<usize>)> {
        match self {
            Self::Stage { stage, scene, .. } => Some((*stage, *scene)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
