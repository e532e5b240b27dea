#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

const FAKE_GIT: &str = r#"#!/bin/sh
echo "$@" >> "$FAKE_GIT_LOG"
for last; do :; done
mkdir -p "$last" && echo cloned > "$last/README"
"#;

struct Project {
    _tmp: TempDir,
    dir: PathBuf,
    git: PathBuf,
    log: PathBuf,
}

impl Project {
    fn new(main_tf: &str) -> Self {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("project");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("main.tf"), main_tf).unwrap();

        let git = tmp.path().join("fake-git");
        fs::write(&git, FAKE_GIT).unwrap();
        fs::set_permissions(&git, fs::Permissions::from_mode(0o755)).unwrap();

        let log = tmp.path().join("git.log");
        Self {
            _tmp: tmp,
            dir,
            git,
            log,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tfboost").unwrap();
        cmd.current_dir(&self.dir)
            .env_remove("TERRAFORM_DIR")
            .env_remove("TFBOOST_CONFIG")
            .env_remove("TFBOOST_CLONE_JOBS")
            .env_remove("TFBOOST_DEDUP_MANIFEST")
            .env_remove("RUST_LOG")
            .env("GIT_PATH", &self.git)
            .env("FAKE_GIT_LOG", &self.log)
            .env("LOGLEVEL", "INFO");
        cmd
    }

    fn git_calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn manifest(&self) -> serde_json::Value {
        let path = self.dir.join(".terraform/modules/modules.json");
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }
}

#[test]
fn test_run_clones_and_writes_manifest() {
    let project = Project::new(
        r#"module "vpc" { source = "git::https://example.com/org/vpc.git?ref=v1.2.0" }
"#,
    );

    project
        .cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("All modules: 1"))
        .stdout(predicate::str::contains("To download: 1"));

    assert_eq!(
        project.git_calls(),
        vec![
            "clone -q -b v1.2.0 --depth 1 -- https://example.com/org/vpc.git .terraform/modules/vpc_v1.2.0"
        ]
    );
    assert!(project.dir.join(".terraform/modules/vpc_v1.2.0/README").exists());

    let manifest = project.manifest();
    let records = manifest["Modules"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["Dir"], ".terraform/modules/vpc_v1.2.0");
}

#[test]
fn test_second_run_does_not_invoke_git_again() {
    let project = Project::new(
        "module \"vpc\" {\n  source = \"git::https://example.com/org/vpc.git?ref=v1.2.0\"\n}\n",
    );

    project.cmd().assert().success();
    project
        .cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Unable to clone").not());

    assert_eq!(project.git_calls().len(), 1);
    assert_eq!(project.manifest()["Modules"].as_array().unwrap().len(), 4);
}

#[test]
fn test_existing_clone_is_reported_at_debug_level() {
    let project = Project::new(
        "module \"vpc\" {\n  source = \"git::https://example.com/org/vpc.git?ref=v1.2.0\"\n}\n",
    );

    project.cmd().assert().success();
    let output = project
        .cmd()
        .env("LOGLEVEL", "DEBUG")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    let line = stdout
        .lines()
        .find(|line| line.contains("Already exists"))
        .expect("an 'Already exists' log line");
    assert!(line.contains(" DEBUG "), "unexpected level in: {}", line);
    assert!(!stdout.contains("Unable to clone"));
    assert!(!stdout.contains(" ERROR "));
    assert_eq!(project.git_calls().len(), 1);
}

#[test]
fn test_missing_git_is_not_fatal() {
    let project = Project::new(
        "module \"vpc\" {\n  source = \"git::https://example.com/org/vpc.git?ref=v1.2.0\"\n}\n",
    );

    project
        .cmd()
        .env("GIT_PATH", project.dir.join("no-such-git"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Unable to clone"));

    assert_eq!(project.manifest()["Modules"].as_array().unwrap().len(), 2);
}

#[test]
fn test_unreadable_tf_file_fails_the_run() {
    let project = Project::new("");
    fs::write(project.dir.join("broken.tf"), b"\xff\xfe\x00").unwrap();

    project
        .cmd()
        .assert()
        .failure()
        .stdout(predicate::str::contains("broken.tf"));
}

#[test]
fn test_debug_level_includes_level_names() {
    let project = Project::new("");

    project
        .cmd()
        .env("LOGLEVEL", "DEBUG")
        .assert()
        .success()
        .stdout(predicate::str::contains("DEBUG"));
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("tfboost")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
