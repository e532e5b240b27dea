use crate::terraform::model::RepositoryTarget;
use crate::terraform::source;
use crate::vcs::client::{CloneOutcome, VcsClient};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneReport {
    pub cloned: usize,
    pub already_present: usize,
    pub failed: usize,
    /// Sources that do not look like `git::<url>/<name>.git?ref=<tag>`.
    pub skipped: usize,
}

impl CloneReport {
    pub fn attempted(&self) -> usize {
        self.cloned + self.already_present + self.failed
    }
}

enum CloneResult {
    Done(CloneOutcome),
    Failed,
}

/// Shallow-clones distinct module sources into the module cache.
pub struct CloneOrchestrator {
    vcs: Arc<dyn VcsClient>,
    project_directory: PathBuf,
    pub max_concurrent: usize,
}

impl CloneOrchestrator {
    pub fn new(vcs: Arc<dyn VcsClient>, project_directory: PathBuf, max_concurrent: usize) -> Self {
        Self {
            vcs,
            project_directory,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Clone every source once. Failures are logged and counted, never returned.
    ///
    /// Sources that resolve to the same cache directory are cloned only for
    /// the first of them; the rest count as already present.
    pub async fn clone_all(&self, sources: &[String]) -> CloneReport {
        let start_time = Instant::now();
        let mut report = CloneReport::default();

        let mut targets = HashSet::new();
        let mut jobs = Vec::new();
        for source in sources {
            match source::resolve(source) {
                Ok(target) => {
                    if targets.insert(target.local_path.clone()) {
                        jobs.push((source.as_str(), target));
                    } else {
                        debug!(
                            "Already exists {} (shared with another source), skipping {}",
                            target.local_path.display(),
                            source
                        );
                        report.already_present += 1;
                    }
                }
                Err(e) => {
                    error!("Not cloning {}: {}", source, e);
                    report.skipped += 1;
                }
            }
        }

        debug!(
            "Cloning {} source(s) with at most {} at a time",
            jobs.len(),
            self.max_concurrent
        );

        let results: Vec<CloneResult> = stream::iter(jobs)
            .map(|(source, target)| self.clone_one(source, target))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        for result in results {
            match result {
                CloneResult::Done(CloneOutcome::Cloned) => report.cloned += 1,
                CloneResult::Done(CloneOutcome::AlreadyExists) => report.already_present += 1,
                CloneResult::Failed => report.failed += 1,
            }
        }

        debug!("Clone step finished in {:?}: {:?}", start_time.elapsed(), report);
        report
    }

    async fn clone_one(&self, source: &str, target: RepositoryTarget) -> CloneResult {
        let url = source::clone_url(source);

        debug!(
            "Cloning {} at {} into {}",
            url,
            target.tag,
            target.local_path.display()
        );
        match self
            .vcs
            .clone_shallow(url, &target.local_path, &target.tag, &self.project_directory)
            .await
        {
            Ok(CloneOutcome::Cloned) => {
                info!("Cloned {} ({})", target.module_slug, target.tag);
                CloneResult::Done(CloneOutcome::Cloned)
            }
            Ok(CloneOutcome::AlreadyExists) => {
                debug!("Already exists {}", target.local_path.display());
                CloneResult::Done(CloneOutcome::AlreadyExists)
            }
            Err(e) => {
                error!("Unable to clone {}: {}", source, e);
                CloneResult::Failed
            }
        }
    }
}
