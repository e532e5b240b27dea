use crate::terraform::model::{ModuleInventory, ModuleReference, Tf11Record, Tf12Record};
use crate::terraform::source::{self, MODULES_DIR};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, warn};

pub const MANIFEST_FILE: &str = "modules.json";
const MODULES_KEY: &str = "Modules";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReport {
    pub path: PathBuf,
    pub appended: usize,
    pub skipped: usize,
}

/// In-memory copy of `.terraform/modules/modules.json`.
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    document: Map<String, Value>,
    dedup: bool,
}

impl Manifest {
    /// Manifest location for a project directory.
    pub fn path_for(project_directory: &Path) -> PathBuf {
        project_directory.join(MODULES_DIR).join(MANIFEST_FILE)
    }

    /// Load the manifest, falling back to `{"Modules": []}` when it is
    /// missing, unreadable, not JSON, or not an object.
    pub fn load(project_directory: &Path) -> Self {
        let path = Self::path_for(project_directory);

        let mut document = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    warn!(
                        "Ignoring manifest {}: top level is {}, not an object",
                        path.display(),
                        json_kind(&other)
                    );
                    Map::new()
                }
                Err(e) => {
                    warn!("Ignoring corrupt manifest {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No manifest at {}, starting empty", path.display());
                Map::new()
            }
            Err(e) => {
                warn!("Unable to read manifest {}: {}", path.display(), e);
                Map::new()
            }
        };

        match document.get(MODULES_KEY) {
            Some(Value::Array(_)) => {}
            Some(other) => {
                warn!(
                    "Manifest \"{}\" is {}, replacing with an empty list",
                    MODULES_KEY,
                    json_kind(other)
                );
                document.insert(MODULES_KEY.to_string(), Value::Array(Vec::new()));
            }
            None => {
                document.insert(MODULES_KEY.to_string(), Value::Array(Vec::new()));
            }
        }

        Self {
            path,
            document,
            dedup: false,
        }
    }

    /// Skip records whose `(Key, Source)` pair is already present.
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[Value] {
        match self.document.get(MODULES_KEY) {
            Some(Value::Array(records)) => records.as_slice(),
            _ => &[],
        }
    }

    /// Append the tf12 and tf11 records for one module.
    pub fn append_module(&mut self, module: &ModuleReference) -> anyhow::Result<usize> {
        let target = source::resolve(&module.source)?;
        let tf12 = serde_json::to_value(Tf12Record::new(module, &target))?;
        let tf11 = serde_json::to_value(Tf11Record::new(module, &target))?;

        let mut appended = 0;
        for record in [tf12, tf11] {
            if self.dedup && self.contains(&record) {
                debug!("Manifest already has {:?}", record.get("Key"));
                continue;
            }
            self.push_record(record);
            appended += 1;
        }
        Ok(appended)
    }

    /// Append records for every module; a failing module is logged and skipped.
    pub fn append_inventory(&mut self, inventory: &ModuleInventory) -> (usize, usize) {
        let mut appended = 0;
        let mut skipped = 0;

        for module in inventory.iter() {
            match self.append_module(module) {
                Ok(count) => appended += count,
                Err(e) => {
                    error!(
                        "Unable to process {}, repo {}: {:#}",
                        module.name, module.source, e
                    );
                    skipped += 1;
                }
            }
        }
        (appended, skipped)
    }

    /// Rewrite the whole file, creating `.terraform/modules` if needed.
    pub fn save(&self) -> Result<(), ManifestError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ManifestError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut content = serde_json::to_string_pretty(&self.document)?;
        content.push('\n');
        std::fs::write(&self.path, content).map_err(|source| ManifestError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn contains(&self, record: &Value) -> bool {
        self.records().iter().any(|existing| {
            existing.get("Key") == record.get("Key") && existing.get("Source") == record.get("Source")
        })
    }

    fn push_record(&mut self, record: Value) {
        match self.document.get_mut(MODULES_KEY) {
            Some(Value::Array(records)) => records.push(record),
            _ => {
                self.document
                    .insert(MODULES_KEY.to_string(), Value::Array(vec![record]));
            }
        }
    }
}

/// Load, append every module of `inventory`, and write back.
pub fn synchronize(
    project_directory: &Path,
    inventory: &ModuleInventory,
    dedup: bool,
) -> Result<ManifestReport, ManifestError> {
    let mut manifest = Manifest::load(project_directory).with_dedup(dedup);
    let (appended, skipped) = manifest.append_inventory(inventory);
    manifest.save()?;

    Ok(ManifestReport {
        path: manifest.path().to_path_buf(),
        appended,
        skipped,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const VPC: &str = "git::https://example.com/org/vpc.git?ref=v1.2.0";

    fn inventory(pairs: &[(&str, &str)]) -> ModuleInventory {
        let mut inventory = ModuleInventory::new();
        for (name, source) in pairs {
            inventory.insert(name.to_string(), source.to_string());
        }
        inventory
    }

    fn read_manifest(dir: &Path) -> Value {
        let content = std::fs::read_to_string(Manifest::path_for(dir)).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn test_missing_manifest_defaults_to_empty_modules() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::load(dir.path());
        assert!(manifest.records().is_empty());
    }

    #[test]
    fn test_synchronize_writes_both_record_shapes() {
        let dir = TempDir::new().unwrap();
        let report = synchronize(dir.path(), &inventory(&[("vpc", VPC)]), false).unwrap();

        assert_eq!(report.appended, 2);
        assert_eq!(report.skipped, 0);
        let value = read_manifest(dir.path());
        assert_eq!(
            value,
            json!({
                "Modules": [
                    {
                        "Key": "vpc",
                        "Source": VPC,
                        "Dir": ".terraform/modules/vpc_v1.2.0"
                    },
                    {
                        "Source": VPC,
                        "Key": format!("1.vpc;{}", VPC),
                        "Version": "",
                        "Dir": ".terraform/modules/vpc_v1.2.0",
                        "Root": ""
                    }
                ]
            })
        );
    }

    #[test]
    fn test_empty_inventory_still_writes_manifest() {
        let dir = TempDir::new().unwrap();
        let report = synchronize(dir.path(), &ModuleInventory::new(), false).unwrap();

        assert_eq!(report.appended, 0);
        assert_eq!(read_manifest(dir.path()), json!({ "Modules": [] }));
    }

    #[test]
    fn test_output_uses_two_space_indent() {
        let dir = TempDir::new().unwrap();
        synchronize(dir.path(), &inventory(&[("vpc", VPC)]), false).unwrap();

        let content = std::fs::read_to_string(Manifest::path_for(dir.path())).unwrap();
        assert!(content.starts_with("{\n  \"Modules\": [\n    {\n      \"Key\""));
        assert!(content.ends_with("}\n"));
    }

    #[test]
    fn test_corrupt_manifest_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = Manifest::path_for(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        synchronize(dir.path(), &inventory(&[("vpc", VPC)]), false).unwrap();

        let value = read_manifest(dir.path());
        assert_eq!(value["Modules"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_non_object_manifest_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = Manifest::path_for(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let manifest = Manifest::load(dir.path());
        assert!(manifest.records().is_empty());
    }

    #[test]
    fn test_existing_content_is_preserved_and_appended() {
        let dir = TempDir::new().unwrap();
        let path = Manifest::path_for(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"Modules": [{"Key": "", "Source": "", "Dir": "."}], "Extra": true}"#,
        )
        .unwrap();

        synchronize(dir.path(), &inventory(&[("vpc", VPC)]), false).unwrap();

        let value = read_manifest(dir.path());
        assert_eq!(value["Extra"], json!(true));
        let records = value["Modules"].as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["Dir"], ".");
    }

    #[test]
    fn test_repeated_runs_accumulate_duplicates() {
        let dir = TempDir::new().unwrap();
        let modules = inventory(&[("vpc", VPC)]);
        synchronize(dir.path(), &modules, false).unwrap();
        synchronize(dir.path(), &modules, false).unwrap();

        let value = read_manifest(dir.path());
        assert_eq!(value["Modules"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_dedup_skips_existing_records() {
        let dir = TempDir::new().unwrap();
        let modules = inventory(&[("vpc", VPC)]);
        synchronize(dir.path(), &modules, true).unwrap();
        let report = synchronize(dir.path(), &modules, true).unwrap();

        assert_eq!(report.appended, 0);
        let value = read_manifest(dir.path());
        assert_eq!(value["Modules"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_unresolvable_module_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let modules = inventory(&[
            ("registry", "terraform-aws-modules/vpc/aws"),
            ("vpc", VPC),
        ]);

        let report = synchronize(dir.path(), &modules, false).unwrap();
        assert_eq!(report.appended, 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_modules_key_with_wrong_type_is_reset() {
        let dir = TempDir::new().unwrap();
        let path = Manifest::path_for(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"Modules": "oops"}"#).unwrap();

        synchronize(dir.path(), &inventory(&[("vpc", VPC)]), false).unwrap();
        let value = read_manifest(dir.path());
        assert_eq!(value["Modules"].as_array().unwrap().len(), 2);
    }
}
