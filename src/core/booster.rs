use crate::config::{BoosterConfig, Config, ConfigError};
use crate::core::cloner::{CloneOrchestrator, CloneReport};
use crate::terraform::manifest::{self, ManifestError, ManifestReport};
use crate::terraform::parser::{self, ExtractError};
use crate::vcs::client::VcsClient;
use crate::vcs::git::SystemGit;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum BoosterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub modules: usize,
    pub distinct_sources: usize,
    pub clone: CloneReport,
    pub manifest: ManifestReport,
}

/// One pass of: scan `*.tf` files, clone their git sources, update `modules.json`.
pub struct Booster {
    project_directory: PathBuf,
    vcs: Arc<dyn VcsClient>,
    clone_jobs: usize,
    dedup_manifest: bool,
}

impl Booster {
    pub fn new(project_directory: PathBuf, vcs: Arc<dyn VcsClient>) -> Self {
        Self {
            project_directory,
            vcs,
            clone_jobs: 1,
            dedup_manifest: false,
        }
    }

    /// Build a booster backed by the system git executable from configuration.
    pub fn from_config(config: &Config) -> Result<Self, BoosterError> {
        let booster: &BoosterConfig = &config.booster;
        let project_directory = booster.project_directory()?;
        let vcs = Arc::new(SystemGit::new(booster.git_path()));

        info!("Project directory: {}", project_directory.display());
        debug!("Using git at {}", vcs.git_path().display());
        Ok(Self::new(project_directory, vcs)
            .with_clone_jobs(booster.clone_jobs())
            .with_dedup_manifest(booster.dedup_manifest))
    }

    pub fn with_clone_jobs(mut self, clone_jobs: usize) -> Self {
        self.clone_jobs = clone_jobs.max(1);
        self
    }

    pub fn with_dedup_manifest(mut self, dedup_manifest: bool) -> Self {
        self.dedup_manifest = dedup_manifest;
        self
    }

    pub fn project_directory(&self) -> &Path {
        &self.project_directory
    }

    pub async fn run(&self) -> Result<RunSummary, BoosterError> {
        let inventory = parser::scan_directory(&self.project_directory)?;
        let sources = inventory.distinct_sources();

        info!("All modules: {}", inventory.len());
        info!("To download: {}", sources.len());

        let cloner = CloneOrchestrator::new(
            self.vcs.clone(),
            self.project_directory.clone(),
            self.clone_jobs,
        );
        let clone = cloner.clone_all(&sources).await;

        let manifest =
            manifest::synchronize(&self.project_directory, &inventory, self.dedup_manifest)?;

        let summary = RunSummary {
            modules: inventory.len(),
            distinct_sources: sources.len(),
            clone,
            manifest,
        };
        info!(
            "Done: {} cloned, {} already present, {} failed; {} manifest record(s) written to {}",
            summary.clone.cloned,
            summary.clone.already_present,
            summary.clone.failed,
            summary.manifest.appended,
            summary.manifest.path.display()
        );
        Ok(summary)
    }
}
