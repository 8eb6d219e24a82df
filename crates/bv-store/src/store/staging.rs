//! Recovery of `.staging/` after an interrupted ingest.
//!
//! Two kinds of files live there: `*.partial` uploads that were never
//! published, and `*.previous` blobs moved aside while a re-ingest was
//! publishing its replacement. Partials are always discarded. A displaced
//! blob is put back when the published blob is missing or does not match the
//! hash the index still records (or, for a record not hashed yet, its recorded
//! size); otherwise it is dropped.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use bv_domain::IndexState;
use serde::Serialize;
use tracing::{debug, warn};

use super::ArtifactStore;
use crate::error::{describe, IoContext, StoreError};
use crate::hash::digest_file;

pub(super) const PARTIAL_SUFFIX: &str = ".partial";
pub(super) const BACKUP_SUFFIX: &str = ".previous";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StagingSweep {
    pub partials_removed: usize,
    pub backups_restored: usize,
    pub backups_discarded: usize,
}

impl ArtifactStore {
    /// Must run under the exclusive directory lock.
    pub(super) fn recover_staging(&self, state: &IndexState) -> Result<StagingSweep, StoreError> {
        let staging = self.config.staging_dir();
        let mut sweep = StagingSweep::default();
        let entries = match fs::read_dir(&staging) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(sweep),
            Err(err) => return Err(StoreError::io(describe("list", &staging), err)),
        };

        for entry in entries {
            let entry = entry.io_context(|| describe("list", &staging))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match name.strip_suffix(BACKUP_SUFFIX) {
                Some(filename) => {
                    let dest = self.config.versions_dir.join(filename);
                    if self.backup_is_authoritative(filename, &path, &dest, state)? {
                        fs::rename(&path, &dest)
                            .io_context(|| describe("restore previous artifact to", &dest))?;
                        warn!(
                            path = %dest.display(),
                            "restored artifact displaced by an interrupted ingest"
                        );
                        sweep.backups_restored += 1;
                    } else {
                        fs::remove_file(&path)
                            .io_context(|| describe("remove stale backup", &path))?;
                        sweep.backups_discarded += 1;
                    }
                }
                None => {
                    fs::remove_file(&path)
                        .io_context(|| describe("remove staging file", &path))?;
                    debug!(path = %path.display(), "removed abandoned staging file");
                    sweep.partials_removed += 1;
                }
            }
        }
        Ok(sweep)
    }

    fn backup_is_authoritative(
        &self,
        filename: &str,
        backup: &Path,
        dest: &Path,
        state: &IndexState,
    ) -> Result<bool, StoreError> {
        if !dest.exists() {
            return Ok(true);
        }
        let Some(record) = state
            .records()
            .iter()
            .find(|record| self.config.artifact_filename(&record.version) == filename)
        else {
            return Ok(false);
        };
        let Some(expected) = record.hash.as_deref() else {
            // Unhashed legacy record: its size is the only evidence.
            let published = blob_len(dest)?;
            let displaced = blob_len(backup)?;
            return Ok(published != record.size && displaced == record.size);
        };
        let published = digest_file(dest).io_context(|| describe("hash", dest))?;
        if published == expected {
            return Ok(false);
        }
        let displaced = digest_file(backup).io_context(|| describe("hash", backup))?;
        Ok(displaced == expected)
    }
}

fn blob_len(path: &Path) -> Result<u64, StoreError> {
    Ok(fs::metadata(path)
        .io_context(|| describe("stat", path))?
        .len())
}
