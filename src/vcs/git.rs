use crate::vcs::client::{is_populated, CloneOutcome, VcsClient, VcsError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Default location of the git executable.
pub const DEFAULT_GIT_PATH: &str = "/usr/bin/git";

/// [`VcsClient`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct SystemGit {
    git_path: PathBuf,
}

impl SystemGit {
    pub fn new(git_path: PathBuf) -> Self {
        Self { git_path }
    }

    pub fn git_path(&self) -> &Path {
        &self.git_path
    }

    fn clone_args(url: &str, target: &Path, reference: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["clone", "-q", "-b", reference, "--depth", "1", "--", url]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(target.as_os_str().to_os_string());
        args
    }
}

#[async_trait]
impl VcsClient for SystemGit {
    async fn clone_shallow(
        &self,
        url: &str,
        target: &Path,
        reference: &str,
        workdir: &Path,
    ) -> Result<CloneOutcome, VcsError> {
        if is_populated(&workdir.join(target)) {
            return Ok(CloneOutcome::AlreadyExists);
        }

        let output = Command::new(&self.git_path)
            .args(Self::clone_args(url, target, reference))
            .current_dir(workdir)
            .output()
            .await
            .map_err(|source| VcsError::Spawn {
                program: self.git_path.display().to_string(),
                source,
            })?;

        if output.status.success() {
            return Ok(CloneOutcome::Cloned);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("already exists") {
            Ok(CloneOutcome::AlreadyExists)
        } else {
            Err(VcsError::CloneFailed {
                url: url.to_string(),
                message: stderr.trim().to_string(),
            })
        }
    }
}
