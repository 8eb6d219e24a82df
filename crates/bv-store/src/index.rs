//! Durable metadata index (`metadata.json`).
//!
//! Loading never writes. Saving goes through a temp file in the same
//! directory followed by a rename, so an interrupted save leaves the previous
//! document intact.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bv_domain::IndexState;
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::error::{describe, IoContext, StoreError};
use crate::lock::ensure_dir;

#[derive(Debug, Clone)]
pub struct MetadataIndex {
    path: PathBuf,
}

/// Index contents plus the versions that still need a hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedIndex {
    pub state: IndexState,
    pub pending_backfill: Vec<String>,
}

impl MetadataIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted index. A missing document is an empty index.
    pub fn load(&self) -> Result<LoadedIndex, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "metadata absent; starting empty");
                return Ok(LoadedIndex::default());
            }
            Err(err) => return Err(StoreError::io(describe("read", &self.path), err)),
        };
        let state: IndexState =
            serde_json::from_slice(&bytes).map_err(|err| StoreError::CorruptMetadata {
                path: self.path.clone(),
                reason: err.to_string(),
            })?;
        let pending_backfill = state.pending_backfill();
        Ok(LoadedIndex {
            state,
            pending_backfill,
        })
    }

    /// Atomically replace the persisted index with `state`.
    pub fn save(&self, state: &IndexState) -> Result<(), StoreError> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;

        let body =
            serde_json::to_vec_pretty(state).map_err(|err| StoreError::Encode(err.to_string()))?;
        let mut tmp = NamedTempFile::new_in(parent)
            .io_context(|| describe("create temp metadata in", parent))?;
        tmp.write_all(&body)
            .io_context(|| describe("write temp metadata", tmp.path()))?;
        tmp.as_file()
            .sync_all()
            .io_context(|| describe("flush temp metadata", tmp.path()))?;
        tmp.persist(&self.path).map_err(|err| {
            StoreError::io(describe("move metadata into place at", &self.path), err.error)
        })?;
        // The rename has landed; a failed directory sync must not turn the
        // save into an error the caller would roll back.
        if let Err(err) = fsync_dir(parent) {
            debug!(
                path = %parent.display(),
                error = %err,
                "failed to sync metadata directory"
            );
        }
        debug!(path = %self.path.display(), records = state.len(), "metadata saved");
        Ok(())
    }

    /// Move an unreadable document aside so it is never silently overwritten.
    pub fn quarantine(&self, reason: &str) -> Result<PathBuf, StoreError> {
        let stamp = time::OffsetDateTime::now_utc().unix_timestamp();
        let mut target = self.path.clone().into_os_string();
        target.push(format!(".corrupt-{stamp}"));
        let target = PathBuf::from(target);
        fs::rename(&self.path, &target)
            .io_context(|| describe("move corrupt metadata aside from", &self.path))?;
        error!(
            path = %self.path.display(),
            moved_to = %target.display(),
            reason,
            "metadata document was corrupt; continuing with an empty index"
        );
        Ok(target)
    }
}

pub(crate) fn fsync_dir(dir: &Path) -> std::io::Result<()> {
    let file = File::open(dir)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bv_domain::VersionRecord;
    use time::OffsetDateTime;

    fn record(version: &str) -> VersionRecord {
        VersionRecord::new(version, 3, OffsetDateTime::UNIX_EPOCH, "aa".repeat(32))
    }

    #[test]
    fn missing_document_loads_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let index = MetadataIndex::new(temp.path().join("metadata.json"));
        let loaded = index.load()?;
        assert!(loaded.state.is_empty());
        assert!(loaded.pending_backfill.is_empty());
        assert!(!index.path().exists(), "load must not create the document");
        Ok(())
    }

    #[test]
    fn save_then_load_preserves_order_and_fields() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let index = MetadataIndex::new(temp.path().join("versions").join("metadata.json"));
        let state = IndexState::new()
            .upsert(record("v10.0"))
            .upsert(record("v2.0"));
        index.save(&state)?;
        let loaded = index.load()?;
        assert_eq!(loaded.state, state);

        let raw = fs::read_to_string(index.path())?;
        assert!(raw.starts_with("{\n  \"versions\": ["), "pretty two-space layout: {raw}");
        assert!(raw.contains("\"uploaded_at\": \"1970-01-01T00:00:00Z\""));
        Ok(())
    }

    #[test]
    fn save_leaves_no_temp_files() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let index = MetadataIndex::new(temp.path().join("metadata.json"));
        index.save(&IndexState::new().upsert(record("v1.0")))?;
        index.save(&IndexState::new().upsert(record("v2.0")))?;
        let names: Vec<_> = fs::read_dir(temp.path())?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<_, _>>()?;
        assert_eq!(names, ["metadata.json"]);
        Ok(())
    }

    #[test]
    fn directory_sync_failures_surface() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let missing = temp.path().join("gone");
        assert!(fsync_dir(temp.path()).is_ok());
        let err = fsync_dir(&missing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[test]
    fn corrupt_document_is_a_typed_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let index = MetadataIndex::new(temp.path().join("metadata.json"));
        fs::write(index.path(), "{\"versions\": [")?;
        let err = index.load().unwrap_err();
        assert!(matches!(err, StoreError::CorruptMetadata { .. }), "{err}");
        assert_eq!(err.code(), "BV310");
        Ok(())
    }

    #[test]
    fn quarantine_moves_document_aside() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let index = MetadataIndex::new(temp.path().join("metadata.json"));
        fs::write(index.path(), "not json")?;
        let moved = index.quarantine("test")?;
        assert!(!index.path().exists());
        assert_eq!(fs::read_to_string(&moved)?, "not json");
        assert!(index.load()?.state.is_empty());
        Ok(())
    }

    #[test]
    fn legacy_records_are_reported_for_backfill() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let index = MetadataIndex::new(temp.path().join("metadata.json"));
        fs::write(
            index.path(),
            r#"{"versions": [
                {"version": "v1.0", "size": 4, "uploaded_at": "2025-01-01T00:00:00Z"},
                {"version": "v2.0", "size": 4, "uploaded_at": "2025-01-02T00:00:00Z", "hash": "ff"}
            ]}"#,
        )?;
        let loaded = index.load()?;
        assert_eq!(loaded.pending_backfill, ["v1.0"]);
        assert_eq!(loaded.state.len(), 2);
        Ok(())
    }
}
