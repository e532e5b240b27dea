use crate::terraform::model::RepositoryTarget;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use thiserror::Error;

/// Module cache directory Terraform looks in, relative to the project root.
pub const MODULES_DIR: &str = ".terraform/modules";

// `<anything>/<slug>.git?ref=<tag>` taken from the final path segment
static REPOSITORY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/.+/([^/]+)\.git\?ref=(.+)").expect("Invalid repository regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Unrecognized module source format: {0} (expected git::<url>/<name>.git?ref=<tag>)")]
    UnrecognizedSourceFormat(String),
}

/// Compute slug, tag and cache path for a `git::<url>?ref=<tag>` source.
pub fn resolve(source: &str) -> Result<RepositoryTarget, SourceError> {
    let captures = REPOSITORY_REGEX
        .captures(source)
        .ok_or_else(|| SourceError::UnrecognizedSourceFormat(source.to_string()))?;

    let module_slug = captures[1].to_string();
    let tag = captures[2].to_string();
    let local_path = PathBuf::from(MODULES_DIR).join(format!("{}_{}", module_slug, tag));

    Ok(RepositoryTarget {
        module_slug,
        tag,
        local_path,
    })
}

/// Plain URL handed to git: query string and `git::` forcing prefix removed.
pub fn clone_url(source: &str) -> &str {
    let without_query = source.split('?').next().unwrap_or(source);
    without_query
        .strip_prefix("git::")
        .unwrap_or(without_query)
}
