//! Request-scoped scratch storage.
//!
//! A [`Scratch`] owns one temporary directory for the whole request. Dropping it removes the
//! directory, so every exit path (errors, encoder timeouts, unwinding panics) cleans up.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::SketchResult;
use crate::languages::LanguageTag;

#[derive(Debug)]
pub struct Scratch {
    dir: tempfile::TempDir,
}

impl Scratch {
    /// Create `sketchcast-XXXXXX` under `root`, or under the system temp dir.
    pub fn new(root: Option<&Path>) -> SketchResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sketchcast-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .with_context(|| format!("create scratch root '{}'", root.display()))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("create scratch directory")?;
        tracing::debug!(dir = %dir.path().display(), "scratch directory created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory for language-independent work on scene `index`.
    pub fn scene_dir(&self, index: usize) -> SketchResult<PathBuf> {
        self.ensure(self.path().join("scenes").join(scene_stem(index)))
    }

    /// Directory for the clips and deliverables of one language.
    pub fn language_dir(&self, language: &LanguageTag) -> SketchResult<PathBuf> {
        self.ensure(self.path().join("lang").join(language.as_str()))
    }

    fn ensure(&self, dir: PathBuf) -> SketchResult<PathBuf> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create scratch dir '{}'", dir.display()))?;
        Ok(dir)
    }

    /// Remove the directory now, logging instead of failing if removal is incomplete.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!(dir = %path.display(), error = %e, "failed to remove scratch directory");
        }
    }
}

/// `scene_001` style stem for 0-based `index`.
pub fn scene_stem(index: usize) -> String {
    format!("scene_{:03}", index + 1)
}
