use std::io::ErrorKind;

use bv_domain::{validate_version, VersionRecord};
use serde::Serialize;
use tracing::{info, warn};

use super::ArtifactStore;
use crate::error::StoreError;
use crate::hash::digest_file;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    pub scanned: usize,
    pub hashed: usize,
    pub missing_blobs: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerifyStatus {
    Ok,
    Mismatch,
    MissingBlob,
    Unhashed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub version: String,
    pub status: VerifyStatus,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl ArtifactStore {
    /// Compute and persist hashes for records that predate hashing.
    ///
    /// Records whose blob is missing or unreadable are skipped and stay
    /// unhashed; the pass never fails because of a single record. Safe to
    /// run repeatedly: once nothing is pending it does no writes.
    pub fn backfill_hashes(&self) -> Result<BackfillSummary, StoreError> {
        let _gate = self.write_gate();
        let _lock = self.dir_lock.exclusive()?;

        let loaded = self.index.load()?;
        let mut summary = BackfillSummary::default();
        if loaded.pending_backfill.is_empty() {
            return Ok(summary);
        }

        let mut state = loaded.state;
        for version in &loaded.pending_backfill {
            summary.scanned += 1;
            if let Err(err) = validate_version(version) {
                warn!(%version, error = %err, "skipping hash backfill for unusable version key");
                summary.failed += 1;
                continue;
            }
            let path = self.config.artifact_path(version);
            match digest_file(&path) {
                Ok(hash) => {
                    if state.fill_hash(version, hash) {
                        summary.hashed += 1;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    warn!(
                        %version,
                        path = %path.display(),
                        "artifact blob missing; leaving record unhashed"
                    );
                    summary.missing_blobs += 1;
                }
                Err(err) => {
                    warn!(
                        %version,
                        path = %path.display(),
                        error = %err,
                        "failed to hash artifact; leaving record unhashed"
                    );
                    summary.failed += 1;
                }
            }
        }

        if summary.hashed > 0 {
            self.index.save(&state)?;
        }
        info!(
            scanned = summary.scanned,
            hashed = summary.hashed,
            missing = summary.missing_blobs,
            failed = summary.failed,
            "hash backfill finished"
        );
        Ok(summary)
    }

    /// Recompute the digest of `version`'s blob and compare it with the
    /// recorded hash.
    ///
    /// Returns `DigestMismatch` when they differ and `NotFound` when either
    /// the record or the blob is absent. Unhashed records report
    /// [`VerifyStatus::Unhashed`].
    pub fn verify(&self, version: &str) -> Result<VerifyReport, StoreError> {
        validate_version(version)?;
        let _gate = self.read_gate();
        let _lock = self.dir_lock.shared()?;
        let state = self.index.load()?.state;
        let record = state
            .find(version)
            .ok_or_else(|| StoreError::not_found(version))?;
        let report = self.check_record(record)?;
        match report.status {
            VerifyStatus::MissingBlob => {
                warn!(%version, "metadata record has no artifact blob");
                Err(StoreError::not_found(version))
            }
            VerifyStatus::Mismatch => Err(StoreError::DigestMismatch {
                version: report.version,
                expected: report.expected.unwrap_or_default(),
                actual: report.actual.unwrap_or_default(),
            }),
            VerifyStatus::Ok | VerifyStatus::Unhashed => Ok(report),
        }
    }

    /// Check every record, reporting problems instead of failing on them.
    pub fn verify_all(&self) -> Result<Vec<VerifyReport>, StoreError> {
        let _gate = self.read_gate();
        let _lock = self.dir_lock.shared()?;
        let state = self.index.load()?.state;
        state
            .records()
            .iter()
            .map(|record| self.check_record(record))
            .collect()
    }

    fn check_record(&self, record: &VersionRecord) -> Result<VerifyReport, StoreError> {
        let mut report = VerifyReport {
            version: record.version.clone(),
            status: VerifyStatus::Ok,
            expected: record.hash.clone(),
            actual: None,
        };
        if validate_version(&record.version).is_err() {
            report.status = VerifyStatus::MissingBlob;
            return Ok(report);
        }
        let path = self.config.artifact_path(&record.version);
        let actual = match digest_file(&path) {
            Ok(actual) => actual,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                report.status = VerifyStatus::MissingBlob;
                return Ok(report);
            }
            Err(err) => {
                return Err(StoreError::io(
                    format!("failed to hash {}", path.display()),
                    err,
                ))
            }
        };
        report.status = match &record.hash {
            None => VerifyStatus::Unhashed,
            Some(expected) if *expected == actual => VerifyStatus::Ok,
            Some(_) => VerifyStatus::Mismatch,
        };
        report.actual = Some(actual);
        Ok(report)
    }
}
