use crate::vcs::git::DEFAULT_GIT_PATH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "TFBOOST_CONFIG";
pub const GIT_PATH_ENV: &str = "GIT_PATH";
pub const PROJECT_DIR_ENV: &str = "TERRAFORM_DIR";
pub const CLONE_JOBS_ENV: &str = "TFBOOST_CLONE_JOBS";
pub const DEDUP_ENV: &str = "TFBOOST_DEDUP_MANIFEST";

pub const MAX_CLONE_JOBS: usize = 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unable to determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub booster: BoosterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoosterConfig {
    #[serde(default)]
    pub git_path: Option<String>,
    #[serde(default)]
    pub project_directory: Option<String>,
    #[serde(default = "default_clone_jobs")]
    pub clone_jobs: usize,
    #[serde(default)]
    pub dedup_manifest: bool,
}

fn default_clone_jobs() -> usize {
    1
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            git_path: None,
            project_directory: None,
            clone_jobs: default_clone_jobs(),
            dedup_manifest: false,
        }
    }
}

/// Defaults plus environment overrides, or the `TFBOOST_CONFIG` file plus
/// environment overrides when that variable is set.
pub fn load() -> Result<Config, ConfigError> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.is_empty() => init_from_path(&path),
        _ => Ok(init_default()),
    }
}

pub fn init_default() -> Config {
    let mut config = Config::default();
    config.apply_env(|key| std::env::var(key).ok());
    config
}

pub fn init_from_path(path: &str) -> Result<Config, ConfigError> {
    let path_buf = PathBuf::from(path);
    let content = std::fs::read_to_string(&path_buf).map_err(|source| ConfigError::Read {
        path: path_buf.clone(),
        source,
    })?;
    let mut config: Config =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_buf,
            source,
        })?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

impl Config {
    /// Overlay environment values. `lookup` is injected so tests need not
    /// touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let booster = &mut self.booster;

        if let Some(path) = lookup(GIT_PATH_ENV).filter(|v| !v.is_empty()) {
            booster.git_path = Some(path);
        }
        if let Some(dir) = lookup(PROJECT_DIR_ENV).filter(|v| !v.is_empty()) {
            booster.project_directory = Some(dir);
        }
        if let Some(jobs) = lookup(CLONE_JOBS_ENV) {
            match jobs.trim().parse::<usize>() {
                Ok(jobs) => booster.clone_jobs = jobs,
                Err(_) => warn!("Ignoring {}={:?}: not a number", CLONE_JOBS_ENV, jobs),
            }
        }
        if let Some(flag) = lookup(DEDUP_ENV) {
            booster.dedup_manifest =
                matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }
}

impl BoosterConfig {
    pub fn clone_jobs(&self) -> usize {
        self.clone_jobs.clamp(1, MAX_CLONE_JOBS)
    }

    /// Configured directory made absolute, or the current directory.
    pub fn project_directory(&self) -> Result<PathBuf, ConfigError> {
        let current_dir = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        Ok(match &self.project_directory {
            Some(dir) => {
                let dir_buf = PathBuf::from(dir);
                if dir_buf.is_absolute() {
                    dir_buf
                } else {
                    current_dir.join(dir_buf)
                }
            }
            None => current_dir,
        })
    }

    /// Explicit `git_path` as given; otherwise `/usr/bin/git`, or `git` from
    /// `PATH` when that default is absent.
    pub fn git_path(&self) -> PathBuf {
        if let Some(path) = &self.git_path {
            return PathBuf::from(path);
        }

        let default = Path::new(DEFAULT_GIT_PATH);
        if default.exists() {
            return default.to_path_buf();
        }

        match which::which("git") {
            Ok(path) => {
                info!(
                    "{} not found, using git from PATH: {}",
                    DEFAULT_GIT_PATH,
                    path.display()
                );
                path
            }
            Err(_) => default.to_path_buf(),
        }
    }
}
