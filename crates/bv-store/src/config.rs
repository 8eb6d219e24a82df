use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use dirs_next::{data_dir, home_dir};

const VERSIONS_DIR: &str = "versions";
const CHANGELOGS_DIR: &str = "changelogs";
const STAGING_DIR: &str = ".staging";
const LOCK_FILENAME: &str = ".bv.lock";
const DEFAULT_METADATA_FILE: &str = "metadata.json";
const DEFAULT_ARTIFACT_PREFIX: &str = "orbrunner";
const DEFAULT_ARTIFACT_EXT: &str = "jar";

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn flag_is_enabled(&self, key: &str) -> bool {
        matches!(self.vars.get(key).map(String::as_str), Some("1"))
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Storage settings, built once at process start and handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub versions_dir: PathBuf,
    pub changelogs_dir: PathBuf,
    pub artifact_prefix: String,
    pub artifact_ext: String,
    pub metadata_file: String,
    /// Fall back to an empty index when `metadata.json` cannot be parsed.
    /// The corrupt document is moved aside, never silently overwritten.
    pub recover_corrupt_metadata: bool,
    pub backfill_on_open: bool,
}

impl StoreConfig {
    /// Default layout under `root`: `versions/` and `changelogs/`.
    #[must_use]
    pub fn at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            versions_dir: root.join(VERSIONS_DIR),
            changelogs_dir: root.join(CHANGELOGS_DIR),
            artifact_prefix: DEFAULT_ARTIFACT_PREFIX.to_string(),
            artifact_ext: DEFAULT_ARTIFACT_EXT.to_string(),
            metadata_file: DEFAULT_METADATA_FILE.to_string(),
            recover_corrupt_metadata: false,
            backfill_on_open: true,
        }
    }

    /// Builds a configuration from the current process environment.
    ///
    /// `root` takes precedence over `BV_HOME` when supplied.
    ///
    /// # Errors
    /// Returns an error if no root is given and the default data directory
    /// cannot be determined.
    pub fn from_env(root: Option<PathBuf>) -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture(), root)
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot, root: Option<PathBuf>) -> Result<Self> {
        let root = match root {
            Some(root) => root,
            None => match snapshot.var("BV_HOME") {
                Some(home) => PathBuf::from(home),
                None => default_root()?,
            },
        };
        let mut config = Self::at(&root);
        if let Some(dir) = snapshot.var("BV_VERSIONS_DIR") {
            config.versions_dir = PathBuf::from(dir);
        }
        if let Some(dir) = snapshot.var("BV_CHANGELOGS_DIR") {
            config.changelogs_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = snapshot.var("BV_ARTIFACT_PREFIX") {
            config.artifact_prefix = prefix.to_string();
        }
        if let Some(ext) = snapshot.var("BV_ARTIFACT_EXT") {
            config.artifact_ext = ext.trim_start_matches('.').to_string();
        }
        config.recover_corrupt_metadata = snapshot.flag_is_enabled("BV_RECOVER_CORRUPT_METADATA");
        config.backfill_on_open = match snapshot.var("BV_BACKFILL_ON_OPEN") {
            Some(value) => {
                let lowered = value.to_ascii_lowercase();
                lowered != "0" && lowered != "false"
            }
            None => true,
        };
        Ok(config)
    }

    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.versions_dir.join(&self.metadata_file)
    }

    /// `<versions_dir>/<prefix>-<version>.<ext>`
    #[must_use]
    pub fn artifact_path(&self, version: &str) -> PathBuf {
        self.versions_dir.join(self.artifact_filename(version))
    }

    #[must_use]
    pub fn artifact_filename(&self, version: &str) -> String {
        format!("{}-{version}.{}", self.artifact_prefix, self.artifact_ext)
    }

    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.versions_dir.join(STAGING_DIR)
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.versions_dir.join(LOCK_FILENAME)
    }
}

/// `<data dir>/buildvault`, or `~/.buildvault` when the platform reports no
/// data directory.
pub fn default_root() -> Result<PathBuf> {
    if let Some(data) = data_dir() {
        return Ok(data.join("buildvault"));
    }
    let home = home_dir().ok_or_else(|| anyhow!("unable to determine home directory"))?;
    Ok(home.join(".buildvault"))
}
