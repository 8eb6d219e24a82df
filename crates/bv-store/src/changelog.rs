//! Release notes keyed by version: `<changelogs_dir>/<version>.md`.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{describe, StoreError};

#[derive(Debug, Clone)]
pub struct ChangelogStore {
    dir: PathBuf,
}

impl ChangelogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Markdown changelog for `version`.
    ///
    /// Only `v` followed by digits and dots is accepted as a key.
    pub fn get(&self, version: &str) -> Result<String, StoreError> {
        if !is_changelog_key(version) {
            return Err(StoreError::InvalidChangelogVersion(version.to_string()));
        }
        let path = self.dir.join(format!("{version}.md"));
        match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!(%version, path = %path.display(), "changelog hit");
                Ok(contents)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::ChangelogNotFound {
                version: version.to_string(),
            }),
            Err(err) => Err(StoreError::io(describe("read", &path), err)),
        }
    }
}

fn is_changelog_key(version: &str) -> bool {
    match version.strip_prefix('v') {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit() || b == b'.'),
        None => false,
    }
}
