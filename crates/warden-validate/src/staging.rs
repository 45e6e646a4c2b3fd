//! Staging copies for syntax testing
//!
//! Staged files are keyed by the target's base file name, not by content:
//! two concurrent proposals for the same target overwrite each other's
//! staging copy. Callers needing isolation across concurrent proposals
//! for one target must serialize them.

use crate::error::ValidationError;
use std::path::{Path, PathBuf};

/// A directory of isolated staging copies
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Staging area rooted at `dir` (created lazily on first stage)
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of this staging area
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `content` to the staging copy for `target_id`
    ///
    /// # Errors
    /// Returns [`ValidationError::Staging`] if the copy cannot be written.
    pub async fn stage(&self, target_id: &str, content: &str) -> Result<PathBuf, ValidationError> {
        let staged = self.dir.join(base_name(target_id));
        let io = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&staged, content).await
        };
        io.await.map_err(|source| ValidationError::Staging {
            target: target_id.to_string(),
            source,
        })?;

        tracing::debug!(target = %target_id, staged = %staged.display(), "proposal staged");
        Ok(staged)
    }
}

fn base_name(target_id: &str) -> String {
    Path::new(target_id)
        .file_name()
        .and_then(|n| n.to_str())
        .map(ToString::to_string)
        .unwrap_or_else(|| target_id.replace(['/', '\\'], "_"))
}
