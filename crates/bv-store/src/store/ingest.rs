use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use bv_domain::{timestamp, validate_version, IndexState, VersionRecord};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::staging::{BACKUP_SUFFIX, PARTIAL_SUFFIX};
use super::ArtifactStore;
use crate::error::{describe, IoContext, StoreError};
use crate::hash::HashingWriter;
use crate::index::fsync_dir;
use crate::lock::ensure_dir;

/// A fully written, hashed upload that has not been published yet.
struct StagedBlob {
    file: NamedTempFile,
    hash: String,
    size: u64,
}

impl ArtifactStore {
    /// Store `artifact` as `version`, replacing any earlier upload of the
    /// same version, and return the persisted record.
    ///
    /// Nothing becomes visible to readers until both the blob and the index
    /// are in place. A failed or aborted ingest leaves the previous blob and
    /// record untouched.
    pub fn ingest<R: Read>(
        &self,
        version: &str,
        artifact: R,
    ) -> Result<VersionRecord, StoreError> {
        validate_version(version)?;
        let _gate = self.write_gate();
        let _lock = self.dir_lock.exclusive()?;

        let staged = self.stage(version, artifact)?;
        let record = VersionRecord::new(
            version,
            staged.size,
            timestamp::now_utc(),
            staged.hash.clone(),
        );
        let current = self.index.load()?;
        let replacing = current.state.find(version).is_some();
        let next = current.state.upsert(record.clone());
        self.publish(version, staged, &next)?;

        info!(
            %version,
            size = record.size,
            hash = record.hash.as_deref().unwrap_or_default(),
            replaced = replacing,
            "artifact ingested"
        );
        Ok(record)
    }

    fn stage<R: Read>(&self, version: &str, artifact: R) -> Result<StagedBlob, StoreError> {
        let staging = self.config.staging_dir();
        ensure_dir(&staging)?;
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{version}."))
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&staging)
            .io_context(|| describe("create staging file in", &staging))?;

        let mut writer = HashingWriter::new(file.as_file_mut());
        writer
            .copy_from(artifact)
            .map_err(|err| StoreError::io(format!("failed to stage artifact {version}"), err))?;
        let (_, hash, size) = writer.finish();
        file.as_file()
            .sync_all()
            .io_context(|| describe("flush staging file", file.path()))?;
        debug!(%version, size, "artifact staged");
        Ok(StagedBlob { file, hash, size })
    }

    /// Move the staged blob into place and save the index. If either step
    /// fails, the previous blob is put back before the error is returned.
    fn publish(
        &self,
        version: &str,
        staged: StagedBlob,
        next: &IndexState,
    ) -> Result<(), StoreError> {
        let dest = self.config.artifact_path(version);
        let backup = self.displace_existing(version)?;

        if let Err(err) = staged.file.persist(&dest) {
            restore_backup(backup.as_ref(), &dest);
            return Err(StoreError::io(
                describe("move artifact into place at", &dest),
                err.error,
            ));
        }

        if let Err(err) = self.index.save(next) {
            warn!(%version, error = %err, "metadata save failed; rolling back artifact");
            if let Err(remove_err) = fs::remove_file(&dest) {
                warn!(
                    path = %dest.display(),
                    error = %remove_err,
                    "failed to remove unpublished artifact"
                );
            }
            restore_backup(backup.as_ref(), &dest);
            return Err(err);
        }

        if let Some(backup) = backup {
            if let Err(err) = fs::remove_file(&backup) {
                debug!(
                    path = %backup.display(),
                    error = %err,
                    "stale artifact backup left for sweep"
                );
            }
        }
        let staging = self.config.staging_dir();
        if let Err(err) = fsync_dir(&staging) {
            debug!(
                path = %staging.display(),
                error = %err,
                "failed to sync staging directory after publish"
            );
        }
        Ok(())
    }

    fn displace_existing(&self, version: &str) -> Result<Option<PathBuf>, StoreError> {
        let dest = self.config.artifact_path(version);
        if !dest.exists() {
            return Ok(None);
        }
        let backup = self.config.staging_dir().join(format!(
            "{}{BACKUP_SUFFIX}",
            self.config.artifact_filename(version)
        ));
        fs::rename(&dest, &backup)
            .io_context(|| describe("move previous artifact aside from", &dest))?;
        Ok(Some(backup))
    }
}

fn restore_backup(backup: Option<&PathBuf>, dest: &Path) {
    let Some(backup) = backup else {
        return;
    };
    if let Err(err) = fs::rename(backup, dest) {
        warn!(
            backup = %backup.display(),
            dest = %dest.display(),
            error = %err,
            "failed to restore previous artifact; it will be recovered on next open"
        );
    }
}
