// Re-export modules for testing and external use
pub mod shared {
    pub mod logging;
}

pub mod terraform {
    pub mod manifest;
    pub mod model;
    pub mod parser;
    pub mod source;
}

pub mod vcs {
    pub mod client;
    pub mod git;

    pub use client::{CloneOutcome, VcsClient, VcsError};
    pub use git::SystemGit;
}

pub mod core {
    pub mod booster;
    pub mod cloner;
}

pub mod config;

// Re-export commonly used types for easier testing and external use
pub use core::booster::{Booster, BoosterError, RunSummary};
pub use core::cloner::CloneReport;
pub use terraform::manifest::{Manifest, ManifestReport};
pub use terraform::model::{ModuleInventory, ModuleReference, RepositoryTarget};
