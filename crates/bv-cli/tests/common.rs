#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use assert_cmd::{assert::Assert, cargo::cargo_bin_cmd, Command};
use serde_json::Value;
use tempfile::TempDir;

const STORE_ENV: [&str; 7] = [
    "BV_HOME",
    "BV_VERSIONS_DIR",
    "BV_CHANGELOGS_DIR",
    "BV_ARTIFACT_PREFIX",
    "BV_ARTIFACT_EXT",
    "BV_RECOVER_CORRUPT_METADATA",
    "BV_BACKFILL_ON_OPEN",
];

pub fn store_root(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("tempdir")
}

/// `bv --root <root>` with any ambient store settings cleared.
pub fn bv(root: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("bv");
    for key in STORE_ENV {
        cmd.env_remove(key);
    }
    cmd.arg("--root").arg(root);
    cmd
}

pub fn versions_dir(root: &Path) -> PathBuf {
    root.join("versions")
}

pub fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("write artifact");
    path
}

pub fn ingest(root: &Path, version: &str, bytes: &[u8]) {
    bv(root)
        .args(["ingest", version, "-"])
        .write_stdin(bytes.to_vec())
        .assert()
        .success();
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stdout_text(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

pub fn stderr_text(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stderr.clone()).expect("utf8 stderr")
}
