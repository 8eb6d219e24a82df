//! Versioned artifact store.
//!
//! Layout (under `versions_dir`):
//! - `<prefix>-<version>.<ext>`: one blob per version
//! - `metadata.json`: the ordered index
//! - `.staging/`: in-flight uploads and displaced blobs, never referenced
//!   by metadata
//! - `.bv.lock`: cross-process reader/writer lock
//!
//! Every mutation runs under the in-process write gate and the exclusive
//! directory lock; reads take the shared side of both. Ingest stages the
//! blob, hashes it while writing, then publishes blob and index together.
//!
//! Module map:
//! - ingest + publish: `store/ingest.rs`
//! - backfill + verification: `store/integrity.rs`
//! - staging recovery on open: `store/staging.rs`

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bv_domain::{validate_version, IndexState, VersionRecord};
use serde::Serialize;
use tracing::{debug, warn};

use crate::changelog::ChangelogStore;
use crate::config::StoreConfig;
use crate::error::{describe, StoreError};
use crate::index::MetadataIndex;
use crate::lock::{ensure_dir, DirLock};

mod ingest;
mod integrity;
mod staging;


pub use integrity::{BackfillSummary, VerifyReport, VerifyStatus};
pub use staging::StagingSweep;

#[derive(Debug)]
pub struct ArtifactStore {
    config: StoreConfig,
    index: MetadataIndex,
    changelogs: ChangelogStore,
    dir_lock: DirLock,
    gate: RwLock<()>,
}

/// Summary of the repairs performed while opening a store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OpenReport {
    pub staging: StagingSweep,
    pub quarantined_metadata: Option<PathBuf>,
    pub backfill: Option<BackfillSummary>,
}

impl ArtifactStore {
    /// Open the store described by `config`, creating its directories.
    ///
    /// Opening sweeps leftovers from interrupted ingests, applies the
    /// corrupt-metadata policy and, unless disabled, backfills missing hashes.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        Self::open_with_report(config).map(|(store, _)| store)
    }

    pub fn open_with_report(config: StoreConfig) -> Result<(Self, OpenReport), StoreError> {
        ensure_dir(&config.versions_dir)?;
        ensure_dir(&config.changelogs_dir)?;
        let store = Self {
            index: MetadataIndex::new(config.metadata_path()),
            changelogs: ChangelogStore::new(&config.changelogs_dir),
            dir_lock: DirLock::new(config.lock_path()),
            gate: RwLock::new(()),
            config,
        };

        let mut report = OpenReport::default();
        {
            let _gate = store.write_gate();
            let _lock = store.dir_lock.exclusive()?;
            let state = match store.index.load() {
                Ok(loaded) => loaded.state,
                Err(StoreError::CorruptMetadata { reason, .. })
                    if store.config.recover_corrupt_metadata =>
                {
                    report.quarantined_metadata = Some(store.index.quarantine(&reason)?);
                    IndexState::new()
                }
                Err(err) => return Err(err),
            };
            report.staging = store.recover_staging(&state)?;
        }
        if store.config.backfill_on_open {
            report.backfill = Some(store.backfill_hashes()?);
        }
        debug!(
            versions_dir = %store.config.versions_dir.display(),
            "artifact store opened"
        );
        Ok((store, report))
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// All records in version order.
    pub fn list_versions(&self) -> Result<Vec<VersionRecord>, StoreError> {
        Ok(self.read_index()?.into_records())
    }

    /// The highest version, or `NotFound` when nothing has been ingested.
    pub fn get_latest(&self) -> Result<VersionRecord, StoreError> {
        self.read_index()?
            .latest()
            .cloned()
            .ok_or_else(|| StoreError::not_found("latest"))
    }

    /// The record for `version`, provided its blob is also present.
    pub fn get_by_version(&self, version: &str) -> Result<VersionRecord, StoreError> {
        validate_version(version)?;
        let _gate = self.read_gate();
        let _lock = self.dir_lock.shared()?;
        let state = self.index.load()?.state;
        let record = state
            .find(version)
            .cloned()
            .ok_or_else(|| StoreError::not_found(version))?;
        let blob = self.config.artifact_path(version);
        if !blob.is_file() {
            warn!(
                %version,
                path = %blob.display(),
                "metadata record has no artifact blob"
            );
            return Err(StoreError::not_found(version));
        }
        Ok(record)
    }

    /// Open the stored blob for `version`.
    pub fn fetch(&self, version: &str) -> Result<ArtifactReader, StoreError> {
        validate_version(version)?;
        let _gate = self.read_gate();
        let _lock = self.dir_lock.shared()?;
        let path = self.config.artifact_path(version);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::not_found(version));
            }
            Err(err) => return Err(StoreError::io(describe("open artifact", &path), err)),
        };
        let len = file
            .metadata()
            .map_err(|err| StoreError::io(describe("stat artifact", &path), err))?
            .len();
        debug!(%version, size = len, "artifact fetch");
        Ok(ArtifactReader { file, path, len })
    }

    /// Markdown release notes for `version`.
    pub fn changelog(&self, version: &str) -> Result<String, StoreError> {
        self.changelogs.get(version)
    }

    fn read_index(&self) -> Result<IndexState, StoreError> {
        let _gate = self.read_gate();
        let _lock = self.dir_lock.shared()?;
        Ok(self.index.load()?.state)
    }

    // The gate guards no data of its own; on-disk state is only ever replaced
    // by rename, so a poisoned gate is safe to reuse.
    fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Readable handle on a stored blob.
///
/// The handle stays valid if the version is re-ingested while it is open;
/// it keeps reading the bytes that were current when it was opened.
#[derive(Debug)]
pub struct ArtifactReader {
    file: File,
    path: PathBuf,
    len: u64,
}

impl ArtifactReader {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(usize::try_from(self.len).unwrap_or(0));
        self.file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl Read for ArtifactReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}
