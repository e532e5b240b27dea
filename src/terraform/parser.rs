use crate::terraform::model::{ModuleInventory, ModuleReference};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// How many lines after a module header may separate it from its `source`.
pub const SOURCE_LOOKAHEAD_LINES: usize = 16;

static MODULE_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*module\s+"([^"]+)"\s*\{"#).expect("Invalid module header regex")
});

static SOURCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*source\s*=\s*"([^"]+)""#).expect("Invalid source regex")
});

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to read Terraform file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parser for `module` blocks in Terraform HCL files
pub struct TerraformParser {
    content: String,
}

impl TerraformParser {
    pub fn new(content: String) -> Self {
        Self { content }
    }

    /// Parse every module block that declares a quoted `source`, in file order.
    pub fn parse_modules(&self) -> Vec<ModuleReference> {
        let headers: Vec<_> = MODULE_HEADER_REGEX.captures_iter(&self.content).collect();

        headers
            .iter()
            .enumerate()
            .filter_map(|(i, captures)| {
                let header = captures.get(0)?;
                let block_end = headers
                    .get(i + 1)
                    .and_then(|next| next.get(0))
                    .map(|m| m.start())
                    .unwrap_or(self.content.len());
                let body = Self::lookahead_window(&self.content[header.end()..block_end]);

                let source = SOURCE_REGEX.captures(body)?.get(1)?.as_str().to_string();
                Some(ModuleReference {
                    name: captures[1].to_string(),
                    source,
                })
            })
            .collect()
    }

    // Rest of the header line plus up to SOURCE_LOOKAHEAD_LINES following
    // lines, ending at the line that closes the block.
    fn lookahead_window(body: &str) -> &str {
        let mut depth: i64 = 1;
        let mut len = 0;
        for line in body.split_inclusive('\n').take(SOURCE_LOOKAHEAD_LINES + 1) {
            len += line.len();
            depth += line.matches('{').count() as i64 - line.matches('}').count() as i64;
            if depth <= 0 {
                break;
            }
        }
        &body[..len]
    }
}

/// Top-level `*.tf` files of `dir`, hidden files excluded, sorted by name.
pub fn terraform_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ExtractError::FileRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            let visible_tf = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| !name.starts_with('.') && name.ends_with(".tf"));
            visible_tf && path.is_file()
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Build the module inventory for every Terraform file in `dir`.
///
/// Any file that cannot be read aborts the scan.
pub fn scan_directory(dir: &Path) -> Result<ModuleInventory, ExtractError> {
    let mut inventory = ModuleInventory::new();

    for path in terraform_files(dir)? {
        let content = std::fs::read_to_string(&path).map_err(|source| ExtractError::FileRead {
            path: path.clone(),
            source,
        })?;

        let modules = TerraformParser::new(content).parse_modules();
        debug!("{}: {} module(s)", path.display(), modules.len());
        for module in modules {
            inventory.insert(module.name, module.source);
        }
    }

    Ok(inventory)
}
