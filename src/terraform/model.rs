use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A `module` block found in the configuration: its declared name and the
/// source string exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    pub name: String,
    pub source: String,
}

/// Module name -> source URI, in order of first appearance.
///
/// Re-inserting an existing name replaces its source but keeps its position,
/// so the last declaration wins without reordering the inventory.
#[derive(Debug, Default, Clone)]
pub struct ModuleInventory {
    entries: Vec<ModuleReference>,
    index: HashMap<String, usize>,
}

impl ModuleInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, source: String) {
        match self.index.get(&name).copied() {
            Some(position) => self.entries[position].source = source,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push(ModuleReference { name, source });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&position| self.entries[position].source.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleReference> {
        self.entries.iter()
    }

    /// Distinct source URIs in first-seen order.
    pub fn distinct_sources(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.entries
            .iter()
            .filter(|module| seen.insert(module.source.as_str()))
            .map(|module| module.source.clone())
            .collect()
    }
}

/// Where a source URI lands in the local module cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub module_slug: String,
    pub tag: String,
    /// Relative to the project directory, e.g. `.terraform/modules/vpc_v1.2.0`.
    pub local_path: PathBuf,
}

impl RepositoryTarget {
    /// The path as written into the manifest (always forward slashes).
    pub fn manifest_dir(&self) -> String {
        format!("{}/{}_{}", crate::terraform::source::MODULES_DIR, self.module_slug, self.tag)
    }
}

/// Record layout read by Terraform 0.12 and later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tf12Record {
    pub key: String,
    pub source: String,
    pub dir: String,
}

/// Record layout read by Terraform 0.11.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tf11Record {
    pub source: String,
    pub key: String,
    pub version: String,
    pub dir: String,
    pub root: String,
}

impl Tf12Record {
    pub fn new(module: &ModuleReference, target: &RepositoryTarget) -> Self {
        Self {
            key: module.name.clone(),
            source: module.source.clone(),
            dir: target.manifest_dir(),
        }
    }
}

impl Tf11Record {
    pub fn new(module: &ModuleReference, target: &RepositoryTarget) -> Self {
        Self {
            source: module.source.clone(),
            key: format!("1.{};{}", module.name, module.source),
            version: String::new(),
            dir: target.manifest_dir(),
            root: String::new(),
        }
    }
}
