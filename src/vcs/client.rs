use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Clone of {url} failed: {message}")]
    CloneFailed { url: String, message: String },
}

/// Successful results of a clone request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    Cloned,
    /// The target directory was already populated; nothing was fetched.
    AlreadyExists,
}

/// The one capability the booster needs from a version-control client.
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Depth-1, single-branch clone of `reference` from `url` into `target`.
    ///
    /// A relative `target` is resolved against `workdir`.
    async fn clone_shallow(
        &self,
        url: &str,
        target: &Path,
        reference: &str,
        workdir: &Path,
    ) -> Result<CloneOutcome, VcsError>;
}

/// True when `path` is a directory with at least one entry.
pub(crate) fn is_populated(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
